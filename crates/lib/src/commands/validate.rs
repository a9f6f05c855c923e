//! Static checks on a command list.
//!
//! Validation never runs anything. It rejects lists a pass could not execute
//! sensibly: units without IDs, bad env prefixes, and triggers that point at
//! themselves, at nothing, or in the wrong direction. `onChange` and `onFail`
//! targets must come before the unit; `onRemove` targets must come after it,
//! since remove passes walk the list backwards.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::env;

use super::types::{Commands, Trigger, TriggerKind};

/// A single problem with one unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
  #[error("missing id")]
  MissingId,

  #[error("duplicate id")]
  DuplicateId,

  #[error("invalid envPrefix {0:?}")]
  InvalidEnvPrefix(String),

  #[error("{kind}: cannot target itself")]
  SelfTarget { kind: TriggerKind },

  #[error("{kind}: {target} does not exist")]
  MissingTarget { kind: TriggerKind, target: String },

  #[error("{kind}: {target} has been ran already")]
  RanAlready { kind: TriggerKind, target: String },
}

/// Violations keyed by unit ID. Units without an ID are keyed by `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport(BTreeMap<String, Vec<Violation>>);

impl ValidationReport {
  fn add(&mut self, id: &str, violation: Violation) {
    debug!(id = %id, violation = %violation, "validation failed");
    self.0.entry(id.to_string()).or_default().push(violation);
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Number of units with at least one violation.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn get(&self, id: &str) -> &[Violation] {
    self.0.get(id).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &[Violation])> {
    self.0.iter().map(|(id, v)| (id.as_str(), v.as_slice()))
  }
}

impl fmt::Display for ValidationReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, (id, violations)) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{:?}: ", id)?;
      for (j, violation) in violations.iter().enumerate() {
        if j > 0 {
          f.write_str(", ")?;
        }
        write!(f, "{}", violation)?;
      }
    }
    Ok(())
  }
}

#[derive(Debug, Error)]
pub enum ValidateError {
  #[error("no commands specified")]
  NoCommands,

  #[error("invalid commands: {0}")]
  Invalid(ValidationReport),
}

impl Commands {
  /// Check the list and report every violation at once.
  pub fn validate(&self) -> Result<(), ValidateError> {
    if self.is_empty() {
      return Err(ValidateError::NoCommands);
    }

    let mut report = ValidationReport::default();
    let mut seen = HashSet::new();

    for (idx, command) in self.iter().enumerate() {
      let id = command.id.as_str();

      if id.is_empty() {
        report.add(id, Violation::MissingId);
      } else if !seen.insert(id) {
        report.add(id, Violation::DuplicateId);
      }

      if !env::is_valid_prefix(&command.env_prefix) {
        report.add(id, Violation::InvalidEnvPrefix(command.env_prefix.clone()));
      }

      for kind in [TriggerKind::OnChange, TriggerKind::OnFail, TriggerKind::OnRemove] {
        for trigger in command.triggers(kind) {
          let Trigger::Unit(target) = trigger else {
            continue;
          };

          if target == id {
            report.add(id, Violation::SelfTarget { kind });
            continue;
          }

          let Some(target_idx) = self.position(target) else {
            report.add(
              id,
              Violation::MissingTarget {
                kind,
                target: target.clone(),
              },
            );
            continue;
          };

          let wrong_direction = match kind {
            TriggerKind::OnChange | TriggerKind::OnFail => target_idx > idx,
            TriggerKind::OnRemove => target_idx < idx,
          };
          if wrong_direction {
            report.add(
              id,
              Violation::RanAlready {
                kind,
                target: target.clone(),
              },
            );
          }
        }
      }
    }

    if report.is_empty() {
      Ok(())
    } else {
      Err(ValidateError::Invalid(report))
    }
  }
}
