//! Command types.
//!
//! A [`Command`] is one idempotent unit: a check script that reports whether
//! the system has converged, a change script that converges it, and a remove
//! script that tears it down. [`Commands`] is an ordered list of units; the
//! order is the execution order for change and check passes and the reverse
//! of the execution order for remove passes.
//!
//! # Example
//!
//! ```json
//! [
//!   {
//!     "id": "config",
//!     "check": "test -f /etc/app.conf",
//!     "change": "install -m 0644 app.conf /etc/app.conf",
//!     "remove": "rm /etc/app.conf",
//!     "envPrefix": "CONFIG",
//!     "onChange": ["etcha:restart"]
//!   }
//! ]
//! ```

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::exec::ExecConfig;

/// Prefix marking a trigger as a named event rather than a unit ID.
pub const EVENT_PREFIX: &str = "etcha:";

/// Built-in event that writes the firing script's output to stdout.
pub const EVENT_STDOUT: &str = "stdout";

/// Built-in event that writes the firing script's output to stderr.
pub const EVENT_STDERR: &str = "stderr";

/// Target of an `onChange`, `onFail` or `onRemove` entry.
///
/// Serialized as a plain string: `etcha:<name>` is an event, anything else a
/// unit ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Trigger {
  /// Another unit in the same list.
  Unit(String),
  /// A named event reported to the caller.
  Event(String),
}

impl Trigger {
  pub fn parse(s: &str) -> Self {
    match s.strip_prefix(EVENT_PREFIX) {
      Some(name) => Trigger::Event(name.to_string()),
      None => Trigger::Unit(s.to_string()),
    }
  }

  pub fn unit(&self) -> Option<&str> {
    match self {
      Trigger::Unit(id) => Some(id),
      Trigger::Event(_) => None,
    }
  }

  pub fn event(&self) -> Option<&str> {
    match self {
      Trigger::Event(name) => Some(name),
      Trigger::Unit(_) => None,
    }
  }
}

impl From<String> for Trigger {
  fn from(s: String) -> Self {
    Trigger::parse(&s)
  }
}

impl From<&str> for Trigger {
  fn from(s: &str) -> Self {
    Trigger::parse(s)
  }
}

impl From<Trigger> for String {
  fn from(trigger: Trigger) -> Self {
    trigger.to_string()
  }
}

impl fmt::Display for Trigger {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Trigger::Unit(id) => f.write_str(id),
      Trigger::Event(name) => write!(f, "{}{}", EVENT_PREFIX, name),
    }
  }
}

/// Which trigger list an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriggerKind {
  #[serde(rename = "onChange")]
  OnChange,
  #[serde(rename = "onFail")]
  OnFail,
  #[serde(rename = "onRemove")]
  OnRemove,
}

impl fmt::Display for TriggerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      TriggerKind::OnChange => "onChange",
      TriggerKind::OnFail => "onFail",
      TriggerKind::OnRemove => "onRemove",
    })
  }
}

/// Pass mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  /// Check, then change what failed its check.
  #[default]
  Change,
  /// Check only.
  Check,
  /// Run remove scripts in reverse order.
  Remove,
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Mode::Change => "change",
      Mode::Check => "check",
      Mode::Remove => "remove",
    })
  }
}

impl FromStr for Mode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "change" => Ok(Mode::Change),
      "check" => Ok(Mode::Check),
      "remove" => Ok(Mode::Remove),
      other => Err(format!("unknown mode: {}", other)),
    }
  }
}

/// One idempotent unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Command {
  /// Unique identifier within the list.
  pub id: String,

  /// Skip the check and always run change.
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub always: bool,

  /// Script that exits successfully when the unit has converged.
  #[serde(skip_serializing_if = "String::is_empty")]
  pub check: String,

  /// Script that converges the unit.
  #[serde(skip_serializing_if = "String::is_empty")]
  pub change: String,

  /// Script that tears the unit down.
  #[serde(skip_serializing_if = "String::is_empty")]
  pub remove: String,

  /// Namespace for this unit's result variables.
  #[serde(skip_serializing_if = "String::is_empty")]
  pub env_prefix: String,

  /// Per-unit execution override.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub exec: Option<ExecConfig>,

  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub on_change: Vec<Trigger>,

  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub on_fail: Vec<Trigger>,

  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub on_remove: Vec<Trigger>,
}

impl Command {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      ..Default::default()
    }
  }

  pub fn with_check(mut self, script: impl Into<String>) -> Self {
    self.check = script.into();
    self
  }

  pub fn with_change(mut self, script: impl Into<String>) -> Self {
    self.change = script.into();
    self
  }

  pub fn with_remove(mut self, script: impl Into<String>) -> Self {
    self.remove = script.into();
    self
  }

  pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.env_prefix = prefix.into();
    self
  }

  pub fn always(mut self) -> Self {
    self.always = true;
    self
  }

  pub fn on_change<T: Into<Trigger>>(mut self, targets: impl IntoIterator<Item = T>) -> Self {
    self.on_change = targets.into_iter().map(Into::into).collect();
    self
  }

  pub fn on_fail<T: Into<Trigger>>(mut self, targets: impl IntoIterator<Item = T>) -> Self {
    self.on_fail = targets.into_iter().map(Into::into).collect();
    self
  }

  pub fn on_remove<T: Into<Trigger>>(mut self, targets: impl IntoIterator<Item = T>) -> Self {
    self.on_remove = targets.into_iter().map(Into::into).collect();
    self
  }

  /// Trigger list for `kind`.
  pub fn triggers(&self, kind: TriggerKind) -> &[Trigger] {
    match kind {
      TriggerKind::OnChange => &self.on_change,
      TriggerKind::OnFail => &self.on_fail,
      TriggerKind::OnRemove => &self.on_remove,
    }
  }
}

/// Ordered list of units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commands(pub(crate) Vec<Command>);

impl Commands {
  pub fn push(&mut self, command: Command) {
    self.0.push(command);
  }

  pub fn into_vec(self) -> Vec<Command> {
    self.0
  }

  /// Position of the unit with `id`.
  pub fn position(&self, id: &str) -> Option<usize> {
    self.0.iter().position(|c| c.id == id)
  }

  pub fn get(&self, id: &str) -> Option<&Command> {
    self.0.iter().find(|c| c.id == id)
  }

  pub fn ids(&self) -> Vec<&str> {
    self.0.iter().map(|c| c.id.as_str()).collect()
  }
}

impl Deref for Commands {
  type Target = [Command];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl From<Vec<Command>> for Commands {
  fn from(commands: Vec<Command>) -> Self {
    Self(commands)
  }
}

impl FromIterator<Command> for Commands {
  fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a Commands {
  type Item = &'a Command;
  type IntoIter = std::slice::Iter<'a, Command>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}
