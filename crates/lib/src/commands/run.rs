//! Unit and pass execution.
//!
//! [`Command::run`] drives one unit through check → change (or remove) and
//! records its results in the environment overlay. [`Commands::run`] drives a
//! whole pass: it walks the list as a work queue so that triggers can re-visit
//! units that already ran, fans out `onFail` targets when a unit fails, and
//! collects fired events.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Write};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::env::{self, EnvVars, Phase};
use crate::exec::{CancelToken, ExecConfig, ExecError, ExecRequest, Executor};
use crate::observe::{NoopObserver, Observer, Outcome};
use crate::output::{Output, Outputs};

use super::types::{Command, Commands, EVENT_STDERR, EVENT_STDOUT, Mode, Trigger, TriggerKind};

/// A unit's script failed, or the pass was cancelled while it ran.
#[derive(Debug, Error)]
#[error("{phase} failed for {id}: {source}")]
pub struct CommandError {
  /// ID of the failing unit.
  pub id: String,
  /// Script that failed.
  pub phase: Phase,
  #[source]
  pub source: ExecError,
}

impl CommandError {
  pub fn is_cancelled(&self) -> bool {
    self.source.is_cancelled()
  }
}

/// Where the built-in `stdout` and `stderr` events write the firing script's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventStreams {
  /// `etcha:stdout` writes to stdout, `etcha:stderr` to stderr.
  #[default]
  Split,
  /// Both write to stderr. Used when stdout carries JSON.
  Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
  Stdout,
  Stderr,
}

impl EventStreams {
  fn route(self, event: &str) -> Option<Stream> {
    match (event, self) {
      (EVENT_STDOUT, EventStreams::Split) => Some(Stream::Stdout),
      (EVENT_STDOUT, EventStreams::Stderr) | (EVENT_STDERR, _) => Some(Stream::Stderr),
      _ => None,
    }
  }

  fn write(self, event: &str, output: &str) {
    let result = match self.route(event) {
      Some(Stream::Stdout) => writeln!(io::stdout().lock(), "{}", output),
      Some(Stream::Stderr) => writeln!(io::stderr().lock(), "{}", output),
      None => return,
    };
    if let Err(err) = result {
      warn!(event = %event, error = %err, "failed to write event output");
    }
  }
}

/// Everything a pass needs besides the units themselves.
pub struct RunContext<E> {
  executor: E,
  exec: ExecConfig,
  observer: Arc<dyn Observer>,
  cancel: CancelToken,
  event_streams: EventStreams,
}

impl<E: Executor> RunContext<E> {
  pub fn new(executor: E) -> Self {
    Self {
      executor,
      exec: ExecConfig::default(),
      observer: Arc::new(NoopObserver),
      cancel: CancelToken::new(),
      event_streams: EventStreams::default(),
    }
  }

  /// Default execution settings, overridable per unit.
  pub fn with_exec(mut self, exec: ExecConfig) -> Self {
    self.exec = exec;
    self
  }

  pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
    self.observer = observer;
    self
  }

  pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn with_event_streams(mut self, event_streams: EventStreams) -> Self {
    self.event_streams = event_streams;
    self
  }

  pub fn cancel_token(&self) -> &CancelToken {
    &self.cancel
  }

  /// Run one script through the executor, racing it against cancellation.
  async fn exec(
    &self,
    command: &Command,
    phase: Phase,
    script: &str,
    env: &EnvVars,
  ) -> Result<String, ExecError> {
    if self.cancel.is_cancelled() {
      return Err(ExecError::Cancelled);
    }

    let exec = self.exec.merged(command.exec.as_ref());
    let request = ExecRequest {
      script,
      env,
      stdin: None,
      exec: &exec,
    };

    let result = tokio::select! {
      biased;
      _ = self.cancel.cancelled() => Err(ExecError::Cancelled),
      result = self.executor.run(&request) => result,
    };

    if !matches!(result, Err(ExecError::Cancelled)) {
      self.observer.record(&command.id, Outcome::new(phase, result.is_err()));
    }

    result
  }
}

/// Result of one pass.
#[derive(Debug, Default)]
pub struct RunResult {
  /// One output per unit invocation, in traversal order.
  pub outputs: Outputs,
  /// Overlay after the pass, including every unit's result variables.
  pub env: EnvVars,
  /// The failure that stopped the pass, if any.
  pub error: Option<CommandError>,
}

impl RunResult {
  pub fn is_success(&self) -> bool {
    self.error.is_none()
  }
}

impl Command {
  /// Run this unit.
  ///
  /// `env` is the overlay accumulated so far; this unit's result variables
  /// are added to it. `triggered_by` holds the IDs of units whose triggers
  /// force this unit to change without checking.
  ///
  /// The output is returned even on failure.
  pub async fn run<E: Executor>(
    &self,
    ctx: &RunContext<E>,
    env: &mut EnvVars,
    mode: Mode,
    triggered_by: &[String],
  ) -> (Output, Result<(), CommandError>) {
    let mut output = Output::new(&self.id);
    let result = match mode {
      Mode::Remove => self.run_remove(ctx, env, &mut output).await,
      Mode::Change | Mode::Check => self.run_change(ctx, env, mode, triggered_by, &mut output).await,
    };
    (output, result)
  }

  async fn run_remove<E: Executor>(
    &self,
    ctx: &RunContext<E>,
    env: &mut EnvVars,
    output: &mut Output,
  ) -> Result<(), CommandError> {
    output.removed = true;

    if self.remove.is_empty() {
      debug!(id = %self.id, "no remove script");
      return Ok(());
    }

    info!(id = %self.id, "running remove");

    match ctx.exec(self, Phase::Remove, &self.remove, env).await {
      Ok(out) => {
        env::set_result(env, &self.env_prefix, Phase::Remove, false, &out);
        output.remove_out = out;
        Ok(())
      }
      Err(err) => {
        let out = err.output();
        env::set_result(env, &self.env_prefix, Phase::Remove, true, &out);
        output.remove_fail = true;
        output.remove_out = out;
        Err(self.error(Phase::Remove, err))
      }
    }
  }

  async fn run_change<E: Executor>(
    &self,
    ctx: &RunContext<E>,
    env: &mut EnvVars,
    mode: Mode,
    triggered_by: &[String],
    output: &mut Output,
  ) -> Result<(), CommandError> {
    if self.check.is_empty() && !self.always && triggered_by.is_empty() {
      debug!(id = %self.id, "no check script");
      env.set(env::status_key(&self.env_prefix, Phase::Check), "0");
      return Ok(());
    }

    if self.always {
      debug!(id = %self.id, "always set, skipping check");
    } else if !triggered_by.is_empty() {
      info!(id = %self.id, triggered_by = ?triggered_by, "triggered, skipping check");
    } else {
      match ctx.exec(self, Phase::Check, &self.check, env).await {
        Ok(out) => {
          debug!(id = %self.id, "check passed");
          env::set_result(env, &self.env_prefix, Phase::Check, false, &out);
          output.checked = true;
          output.check_out = out;
          return Ok(());
        }
        Err(err) if err.is_cancelled() => return Err(self.error(Phase::Check, err)),
        Err(err) => {
          debug!(id = %self.id, "check failed");
          let out = err.output();
          env::set_result(env, &self.env_prefix, Phase::Check, true, &out);
          output.checked = true;
          output.check_fail = true;
          output.check_out = out;
        }
      }
    }

    if mode == Mode::Check || self.change.is_empty() {
      return Ok(());
    }

    info!(id = %self.id, "running change");

    // `env` now holds the incoming overlay plus this unit's check variables.
    match ctx.exec(self, Phase::Change, &self.change, env).await {
      Ok(out) => {
        env::set_result(env, &self.env_prefix, Phase::Change, false, &out);
        output.changed = true;
        output.change_out = out;
        Ok(())
      }
      Err(err) => {
        let out = err.output();
        env::set_result(env, &self.env_prefix, Phase::Change, true, &out);
        output.changed = true;
        output.change_fail = true;
        output.change_out = out;
        Err(self.error(Phase::Change, err))
      }
    }
  }

  fn error(&self, phase: Phase, source: ExecError) -> CommandError {
    CommandError {
      id: self.id.clone(),
      phase,
      source,
    }
  }
}

impl Commands {
  /// Run a pass over every unit.
  ///
  /// Change and check passes walk the list in order; remove passes walk it
  /// in reverse. The first failing unit stops the pass: its `onFail` events
  /// are fired and its `onFail` targets plus any later `always` units are
  /// changed before returning. Failures in those side runs never replace the first
  /// error.
  pub async fn run<E: Executor>(&self, ctx: &RunContext<E>, env: EnvVars, mode: Mode) -> RunResult {
    info!(mode = %mode, count = self.len(), "starting pass");

    let mut pass = Pass::new(self, mode, env, ctx.event_streams);

    while let Some(idx) = pass.queue.pop_front() {
      let command = &self.0[idx];
      let triggered_by = pass.triggered.remove(command.id.as_str()).unwrap_or_default();

      let (mut output, result) = command.run(ctx, &mut pass.env, mode, &triggered_by).await;
      pass.visited[idx] = true;

      if let Err(err) = result {
        error!(id = %command.id, error = %err, "command failed");
        output.events.extend(command.on_fail.iter().filter_map(Trigger::event).map(str::to_string));
        pass.outputs.push(output);

        if !err.is_cancelled() {
          pass.fan_out_failure(ctx, idx).await;
        }

        return RunResult {
          outputs: pass.outputs,
          env: pass.env,
          error: Some(err),
        };
      }

      match mode {
        Mode::Change if output.changed => pass.fire(idx, TriggerKind::OnChange, &mut output),
        Mode::Remove if output.removed => pass.fire(idx, TriggerKind::OnRemove, &mut output),
        _ => {}
      }

      pass.outputs.push(output);
    }

    info!(
      mode = %mode,
      outputs = pass.outputs.len(),
      changed = pass.outputs.changed().len(),
      removed = pass.outputs.removed().len(),
      "pass complete"
    );

    RunResult {
      outputs: pass.outputs,
      env: pass.env,
      error: None,
    }
  }

  /// Unit indices in traversal order for `mode`.
  fn traversal(&self, mode: Mode) -> Vec<usize> {
    match mode {
      Mode::Remove => (0..self.len()).rev().collect(),
      Mode::Change | Mode::Check => (0..self.len()).collect(),
    }
  }
}

/// Bookkeeping for one pass. Nothing here outlives the call.
struct Pass<'a> {
  commands: &'a Commands,
  mode: Mode,
  env: EnvVars,
  outputs: Outputs,
  event_streams: EventStreams,
  queue: VecDeque<usize>,
  visited: Vec<bool>,
  /// (firer, target) pairs that already re-queued a visited target. Each
  /// pair re-queues at most once, which ends trigger cycles.
  requeued: HashSet<(usize, usize)>,
  /// Pending triggers: target unit ID -> IDs of the units that fired them.
  triggered: HashMap<&'a str, Vec<String>>,
}

impl<'a> Pass<'a> {
  fn new(commands: &'a Commands, mode: Mode, env: EnvVars, event_streams: EventStreams) -> Self {
    Self {
      commands,
      mode,
      env,
      outputs: Outputs::new(),
      event_streams,
      queue: commands.traversal(mode).into(),
      visited: vec![false; commands.len()],
      requeued: HashSet::new(),
      triggered: HashMap::new(),
    }
  }

  /// Handle `kind` triggers of the unit at `idx` after it succeeded.
  fn fire(&mut self, idx: usize, kind: TriggerKind, output: &mut Output) {
    let commands = self.commands;
    let command = &commands[idx];
    let mut revisits = Vec::new();

    for trigger in command.triggers(kind) {
      match trigger {
        Trigger::Event(name) => {
          debug!(id = %command.id, event = %name, "firing event");
          output.events.push(name.clone());
          let out = match kind {
            TriggerKind::OnRemove => &output.remove_out,
            _ => &output.change_out,
          };
          self.event_streams.write(name, out);
        }
        Trigger::Unit(target) => {
          let Some(target_idx) = commands.position(target) else {
            warn!(id = %command.id, target = %target, "trigger target does not exist");
            continue;
          };
          let target_id = commands[target_idx].id.as_str();
          debug!(id = %command.id, target = %target_id, trigger = %kind, "triggering unit");

          // A visited target that is not waiting to run again goes back on the queue.
          let waiting =
            !self.visited[target_idx] || self.queue.contains(&target_idx) || revisits.contains(&target_idx);
          if !waiting {
            if !self.requeued.insert((idx, target_idx)) {
              warn!(id = %command.id, target = %target_id, "trigger cycle, dropping trigger");
              continue;
            }
            revisits.push(target_idx);
          }

          let firers = self.triggered.entry(target_id).or_default();
          if !firers.contains(&command.id) {
            firers.push(command.id.clone());
          }
        }
      }
    }

    // Re-visit targets next, in trigger order.
    for target_idx in revisits.into_iter().rev() {
      self.queue.push_front(target_idx);
    }
  }

  /// Change `onFail` targets and later `always` units after the unit at
  /// `failed` failed. Failures here are logged, not returned.
  async fn fan_out_failure<E: Executor>(&mut self, ctx: &RunContext<E>, failed: usize) {
    let commands = self.commands;
    let failing = &commands[failed];
    let targets: Vec<&str> = failing.on_fail.iter().filter_map(Trigger::unit).collect();
    let order = commands.traversal(self.mode);
    let failed_pos = order.iter().position(|&i| i == failed).unwrap_or(0);
    let triggered_by = std::slice::from_ref(&failing.id);

    for (pos, &idx) in order.iter().enumerate() {
      if idx == failed {
        continue;
      }

      let command = &commands[idx];
      let after_always = pos > failed_pos && command.always;
      if !after_always && !targets.contains(&command.id.as_str()) {
        continue;
      }

      if ctx.cancel_token().is_cancelled() {
        warn!(id = %command.id, "pass cancelled, skipping failure handling");
        break;
      }

      info!(id = %command.id, failed = %failing.id, "running change after failure");

      let (output, result) = command.run(ctx, &mut self.env, Mode::Change, triggered_by).await;
      self.outputs.push(output);

      if let Err(err) = result {
        error!(id = %command.id, error = %err, "change after failure failed");
      }
    }
  }
}
