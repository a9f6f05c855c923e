//! Execution counters.
//!
//! The engine reports every script result to an [`Observer`] passed in with
//! the run context instead of touching process-wide metrics. [`Counters`]
//! keeps totals in memory; exporters can wrap it or implement the trait
//! directly.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use serde::Serialize;

use crate::env::Phase;

/// Result of one script invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Outcome {
  pub phase: Phase,
  pub failed: bool,
}

impl Outcome {
  pub fn new(phase: Phase, failed: bool) -> Self {
    Self { phase, failed }
  }
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}_{}", self.phase, if self.failed { "fail" } else { "success" })
  }
}

/// Receives script outcomes keyed by unit ID.
pub trait Observer: Send + Sync {
  fn record(&self, id: &str, outcome: Outcome);
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
  fn record(&self, _id: &str, _outcome: Outcome) {}
}

/// In-memory counters keyed by unit ID and outcome.
#[derive(Debug, Default)]
pub struct Counters {
  counts: Mutex<BTreeMap<(String, Outcome), u64>>,
}

impl Counters {
  pub fn new() -> Self {
    Self::default()
  }

  /// Count for one unit and outcome.
  pub fn get(&self, id: &str, outcome: Outcome) -> u64 {
    self.with_counts(|counts| counts.get(&(id.to_string(), outcome)).copied().unwrap_or(0))
  }

  /// Count for an outcome across all units.
  pub fn total(&self, outcome: Outcome) -> u64 {
    self.with_counts(|counts| {
      counts
        .iter()
        .filter(|((_, o), _)| *o == outcome)
        .map(|(_, n)| *n)
        .sum()
    })
  }

  fn with_counts<T>(&self, f: impl FnOnce(&mut BTreeMap<(String, Outcome), u64>) -> T) -> T {
    match self.counts.lock() {
      Ok(mut locked) => f(&mut locked),
      Err(poisoned) => f(&mut poisoned.into_inner()),
    }
  }
}

impl Observer for Counters {
  fn record(&self, id: &str, outcome: Outcome) {
    self.with_counts(|counts| *counts.entry((id.to_string(), outcome)).or_insert(0) += 1);
  }
}
