//! Results of a pass.
//!
//! Each unit invocation produces one [`Output`]; a pass collects them in
//! traversal order into [`Outputs`]. Callers use the derived views to decide
//! whether to persist a revision and which named events to dispatch.

use std::collections::BTreeMap;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
  !*b
}

/// Record of one unit invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Output {
  pub id: String,

  #[serde(skip_serializing_if = "is_false")]
  pub checked: bool,
  #[serde(skip_serializing_if = "is_false")]
  pub check_fail: bool,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub check_out: String,

  #[serde(skip_serializing_if = "is_false")]
  pub changed: bool,
  #[serde(skip_serializing_if = "is_false")]
  pub change_fail: bool,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub change_out: String,

  #[serde(skip_serializing_if = "is_false")]
  pub removed: bool,
  #[serde(skip_serializing_if = "is_false")]
  pub remove_fail: bool,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub remove_out: String,

  /// Event names fired by this invocation, without the `etcha:` prefix.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub events: Vec<String>,
}

impl Output {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      ..Default::default()
    }
  }

  /// Whether the change or remove script failed.
  pub fn failed(&self) -> bool {
    self.change_fail || self.remove_fail
  }
}

/// Outputs of one pass, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outputs(Vec<Output>);

impl Outputs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, output: Output) {
    self.0.push(output);
  }

  pub fn into_vec(self) -> Vec<Output> {
    self.0
  }

  /// IDs of units whose change script ran.
  pub fn changed(&self) -> Vec<&str> {
    self.ids_where(|o| o.changed)
  }

  /// IDs of units whose check script failed.
  pub fn check_fail(&self) -> Vec<&str> {
    self.ids_where(|o| o.check_fail)
  }

  /// IDs of units whose change or remove script failed.
  pub fn failed(&self) -> Vec<&str> {
    self.ids_where(Output::failed)
  }

  /// IDs of units that were removed.
  pub fn removed(&self) -> Vec<&str> {
    self.ids_where(|o| o.removed)
  }

  /// Fired events grouped by name, sorted by name.
  pub fn events(&self) -> Events {
    let mut by_name: BTreeMap<&str, Outputs> = BTreeMap::new();
    for output in &self.0 {
      for name in &output.events {
        by_name.entry(name.as_str()).or_default().push(output.clone());
      }
    }

    Events(
      by_name
        .into_iter()
        .map(|(name, outputs)| Event {
          name: name.to_string(),
          outputs,
        })
        .collect(),
    )
  }

  fn ids_where(&self, pred: impl Fn(&Output) -> bool) -> Vec<&str> {
    self.0.iter().filter(|o| pred(o)).map(|o| o.id.as_str()).collect()
  }
}

impl Deref for Outputs {
  type Target = [Output];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl From<Vec<Output>> for Outputs {
  fn from(outputs: Vec<Output>) -> Self {
    Self(outputs)
  }
}

impl FromIterator<Output> for Outputs {
  fn from_iter<T: IntoIterator<Item = Output>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a Outputs {
  type Item = &'a Output;
  type IntoIter = std::slice::Iter<'a, Output>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

/// A named event and every output that fired it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub name: String,
  pub outputs: Outputs,
}

/// Events of one pass, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Events(Vec<Event>);

impl Events {
  pub fn names(&self) -> Vec<&str> {
    self.0.iter().map(|e| e.name.as_str()).collect()
  }

  pub fn get(&self, name: &str) -> Option<&Event> {
    self.0.iter().find(|e| e.name == name)
  }
}

impl Deref for Events {
  type Target = [Event];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}
