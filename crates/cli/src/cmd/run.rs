//! Implementation of the `etcha run`, `etcha check` and `etcha remove` commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, bail};
use tracing::info;

use etcha_lib::commands::{Commands, Mode, RunResult};
use etcha_lib::env::Phase;
use etcha_lib::exec::CancelToken;
use etcha_lib::observe::{Counters, Outcome};
use etcha_lib::output::Outputs;

use super::{Settings, cancel_on_ctrl_c, load, runtime};
use crate::output::{
  format_duration, print_error, print_info, print_json, print_output, print_stat, print_success, print_warning,
};

/// Execute a pass over the command list in `file`.
///
/// With `old`, only the diff against the previous revision is applied:
/// commands missing from `file` are removed first, then the remaining
/// commands are changed with unchanged ones skipping their checks.
///
/// Returns an error if validation fails, a command fails, or (in check mode)
/// any command needs changes.
pub fn cmd_run(file: &Path, old: Option<&Path>, mode: Mode, settings: &Settings) -> Result<()> {
  let commands = load(file)?;
  commands.validate()?;

  let (remove, change) = match old {
    Some(old) => {
      let diff = commands.diff(&load(old)?);
      info!(change = diff.change.len(), remove = diff.remove.len(), "applying diff");
      (diff.remove, diff.change)
    }
    None => (Commands::default(), commands),
  };

  let cancel = CancelToken::new();
  let counters = Arc::new(Counters::new());
  let ctx = settings.run_context(cancel.clone(), counters.clone());
  let started = Instant::now();

  let rt = runtime()?;
  let (removed, result) = rt.block_on(async {
    tokio::spawn(cancel_on_ctrl_c(cancel));

    let removed = if remove.is_empty() {
      None
    } else {
      let removed = remove.run(&ctx, settings.env.clone(), Mode::Remove).await;
      if !removed.is_success() {
        return (None, removed);
      }
      Some(removed)
    };

    (removed, change.run(&ctx, settings.env.clone(), mode).await)
  });

  let outputs: Outputs = removed
    .into_iter()
    .flat_map(|r| r.outputs.into_vec())
    .chain(result.outputs.iter().cloned())
    .collect();

  if settings.json {
    print_json(&serde_json::json!({
      "mode": mode,
      "outputs": outputs,
      "events": outputs.events(),
      "error": result.error.as_ref().map(ToString::to_string),
    }))?;
  } else {
    print_summary(&outputs, &result, mode, settings.verbose);
    print_stat("Duration", &format_duration(started.elapsed()));
    if settings.verbose {
      print_counters(&counters);
    }
  }

  if let Some(err) = result.error {
    if !settings.json {
      print_error(&err.to_string());
    }
    return Err(err.into());
  }

  if mode == Mode::Check && !outputs.check_fail().is_empty() {
    bail!("{} command(s) need changes", outputs.check_fail().len());
  }

  Ok(())
}

fn print_summary(outputs: &Outputs, result: &RunResult, mode: Mode, verbose: bool) {
  if outputs.is_empty() {
    print_info("No commands ran.");
    return;
  }

  for output in outputs.iter() {
    print_output(output, mode, verbose);
  }
  println!();

  match mode {
    Mode::Check => {
      let drift = outputs.check_fail();
      if drift.is_empty() {
        print_success("All checks passed");
      } else {
        print_warning(&format!("Needs change: {}", drift.join(", ")));
      }
    }
    Mode::Change if result.is_success() => print_success("Run complete!"),
    Mode::Remove if result.is_success() => print_success("Remove complete!"),
    _ => {}
  }

  print_stat("Changed", &outputs.changed().len().to_string());
  print_stat("Removed", &outputs.removed().len().to_string());
  print_stat("Failed", &outputs.failed().len().to_string());

  let events = outputs.events();
  if !events.is_empty() {
    print_stat("Events", &events.names().join(", "));
  }
}

fn print_counters(counters: &Counters) {
  println!();
  println!("Scripts:");
  for phase in [Phase::Check, Phase::Change, Phase::Remove] {
    for failed in [false, true] {
      let outcome = Outcome::new(phase, failed);
      let total = counters.total(outcome);
      if total > 0 {
        print_stat(&outcome.to_string(), &total.to_string());
      }
    }
  }
}
