//! Convergence self-test.
//!
//! Runs the whole list through change, check, remove and check again, and
//! reports units that do not converge or do not tear down cleanly. Findings
//! are returned as data; nothing here fails the caller.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::{debug, info};

use crate::env::EnvVars;
use crate::exec::Executor;

use super::run::{RunContext, RunResult};
use super::types::{Commands, Mode};

/// One convergence defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TestFailure {
  #[error("change had errors")]
  ChangeFailed,

  #[error("check still failed after change")]
  CheckAfterChange,

  #[error("remove had errors")]
  RemoveFailed,

  #[error("check did not fail after remove")]
  CheckAfterRemove,
}

/// Defects keyed by unit ID. Empty when every unit converged.
pub type TestResults = BTreeMap<String, Vec<TestFailure>>;

fn add(results: &mut TestResults, id: &str, failure: TestFailure) {
  if !results.get(id).is_some_and(|f| f.contains(&failure)) {
    results.entry(id.to_string()).or_default().push(failure);
  }
}

fn log_error(phase: &str, result: &RunResult) {
  if let Some(err) = &result.error {
    debug!(phase, error = %err, "pass returned an error");
  }
}

impl Commands {
  /// Check that every unit converges and tears down.
  pub async fn test<E: Executor>(&self, ctx: &RunContext<E>, env: EnvVars) -> TestResults {
    let mut results = TestResults::new();

    info!(count = self.len(), "testing change");
    let change = self.run(ctx, env.clone(), Mode::Change).await;
    log_error("change", &change);

    let mut changed = HashSet::new();
    for output in change.outputs.iter().filter(|o| o.changed && o.checked) {
      if output.change_fail {
        add(&mut results, &output.id, TestFailure::ChangeFailed);
      }
      changed.insert(output.id.as_str());
    }

    info!("testing check after change");
    let check = self.run(ctx, env.clone(), Mode::Check).await;
    log_error("check", &check);
    for output in check.outputs.iter() {
      if changed.contains(output.id.as_str()) && output.check_fail {
        add(&mut results, &output.id, TestFailure::CheckAfterChange);
      }
    }

    info!("testing remove");
    let remove = self.run(ctx, env.clone(), Mode::Remove).await;
    log_error("remove", &remove);
    for output in remove.outputs.iter().filter(|o| o.remove_fail) {
      add(&mut results, &output.id, TestFailure::RemoveFailed);
    }

    info!("testing check after remove");
    let check = self.run(ctx, env, Mode::Check).await;
    log_error("check", &check);
    for output in check.outputs.iter() {
      if changed.contains(output.id.as_str()) && output.checked && !output.check_fail {
        add(&mut results, &output.id, TestFailure::CheckAfterRemove);
      }
    }

    info!(failed = results.len(), "test complete");
    results
  }
}
