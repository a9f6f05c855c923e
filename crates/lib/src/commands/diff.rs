//! Differences between two revisions of a command list.

use tracing::debug;

use super::types::Commands;

/// What a new revision needs to run given the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandsDiff {
  /// Every unit of the new revision, in order. Units whose check and change
  /// scripts are unchanged (and are not `always`) have their check cleared.
  pub change: Commands,
  /// Units of the old revision that are gone from the new one and have a
  /// remove script, in old order.
  pub remove: Commands,
}

impl CommandsDiff {
  /// True when the diff has nothing to change or remove.
  pub fn is_empty(&self) -> bool {
    self.change.is_empty() && self.remove.is_empty()
  }
}

impl Commands {
  /// Compare `self` (the new revision) against `old`.
  ///
  /// Clearing the check of an unchanged unit means a change pass reports it
  /// as converged without running anything, so drift in those units is not
  /// detected. Run a check pass on the full list to catch it.
  pub fn diff(&self, old: &Commands) -> CommandsDiff {
    let mut change = self.clone();
    let mut remove = Commands::default();

    for old_command in old {
      match change.0.iter_mut().find(|c| c.id == old_command.id) {
        Some(command) => {
          if !command.always && command.check == old_command.check && command.change == old_command.change {
            debug!(id = %command.id, "unchanged, skipping check");
            command.check.clear();
          }
        }
        None if !old_command.remove.is_empty() => {
          debug!(id = %old_command.id, "removed from revision");
          remove.push(old_command.clone());
        }
        None => {
          debug!(id = %old_command.id, "removed from revision, no remove script");
        }
      }
    }

    CommandsDiff { change, remove }
  }
}
