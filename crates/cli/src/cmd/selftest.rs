//! Implementation of the `etcha test` command.
//!
//! Applies the command list, checks it, removes it and checks again, then
//! reports every command that did not converge or tear down cleanly.
//! This really runs the change and remove scripts; point it at a disposable
//! system.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};

use etcha_lib::exec::CancelToken;
use etcha_lib::observe::NoopObserver;

use super::{Settings, cancel_on_ctrl_c, load, runtime};
use crate::output::{print_error, print_json, print_success};

pub fn cmd_test(file: &Path, settings: &Settings) -> Result<()> {
  let commands = load(file)?;
  commands.validate()?;

  let cancel = CancelToken::new();
  let ctx = settings.run_context(cancel.clone(), Arc::new(NoopObserver));

  let rt = runtime()?;
  let results = rt.block_on(async {
    tokio::spawn(cancel_on_ctrl_c(cancel));
    commands.test(&ctx, settings.env.clone()).await
  });

  let failures: BTreeMap<&str, Vec<String>> = results
    .iter()
    .map(|(id, f)| (id.as_str(), f.iter().map(ToString::to_string).collect()))
    .collect();

  if settings.json {
    print_json(&serde_json::json!({
      "passed": failures.is_empty(),
      "failures": failures,
    }))?;
  } else if failures.is_empty() {
    print_success(&format!("All {} commands converged", commands.len()));
  } else {
    for (id, messages) in &failures {
      for message in messages {
        print_error(&format!("{}: {}", id, message));
      }
    }
  }

  if !failures.is_empty() {
    bail!("{} command(s) failed testing", failures.len());
  }

  Ok(())
}
