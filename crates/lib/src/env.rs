//! Environment overlay threaded through a pass.
//!
//! Every unit reports its results as environment variables so later units
//! (and the unit's own change script) can inspect them:
//!
//! ```text
//! <PREFIX>_CHECK       "0" passed, "1" failed
//! <PREFIX>_CHECK_OUT   captured check output
//! <PREFIX>_CHANGE      "0" / "1"
//! <PREFIX>_CHANGE_OUT
//! <PREFIX>_REMOVE      "0" / "1"
//! <PREFIX>_REMOVE_OUT
//! ```
//!
//! An empty prefix yields `_CHECK`, `_CHANGE_OUT` and so on.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered set of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.0.insert(key.into(), value.into());
  }

  /// Copy every variable from `other`, overwriting existing keys.
  pub fn extend_from(&mut self, other: &EnvVars) {
    for (key, value) in &other.0 {
      self.0.insert(key.clone(), value.clone());
    }
  }

  /// Return a new overlay with `other` layered on top of `self`.
  pub fn merged(&self, other: &EnvVars) -> EnvVars {
    let mut out = self.clone();
    out.extend_from(other);
    out
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Parse `KEY=VALUE` pairs, as passed on a command line.
  pub fn parse_pairs<I, S>(pairs: I) -> Result<Self, String>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut env = EnvVars::new();
    for pair in pairs {
      let pair = pair.as_ref();
      let Some((key, value)) = pair.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got {:?}", pair));
      };
      if !is_valid_name(key) {
        return Err(format!("invalid environment variable name {:?}", key));
      }
      env.set(key, value);
    }
    Ok(env)
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
  fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
    Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

impl<'a> IntoIterator for &'a EnvVars {
  type Item = (&'a String, &'a String);
  type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

/// Check an environment variable name: a letter or underscore followed by
/// letters, digits or underscores.
pub fn is_valid_name(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check a unit's `envPrefix`. Empty prefixes are allowed.
pub fn is_valid_prefix(prefix: &str) -> bool {
  prefix.is_empty() || is_valid_name(prefix)
}

/// Script phase a result variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  Check,
  Change,
  Remove,
}

impl Phase {
  pub fn as_str(self) -> &'static str {
    match self {
      Phase::Check => "check",
      Phase::Change => "change",
      Phase::Remove => "remove",
    }
  }

  fn suffix(self) -> &'static str {
    match self {
      Phase::Check => "_CHECK",
      Phase::Change => "_CHANGE",
      Phase::Remove => "_REMOVE",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Name of the status variable for `phase`, e.g. `APP_CHECK`.
pub fn status_key(prefix: &str, phase: Phase) -> String {
  format!("{}{}", prefix, phase.suffix())
}

/// Name of the output variable for `phase`, e.g. `APP_CHECK_OUT`.
pub fn output_key(prefix: &str, phase: Phase) -> String {
  format!("{}{}_OUT", prefix, phase.suffix())
}

/// Record a phase result under `prefix`.
pub fn set_result(env: &mut EnvVars, prefix: &str, phase: Phase, failed: bool, output: &str) {
  env.set(status_key(prefix, phase), if failed { "1" } else { "0" });
  env.set(output_key(prefix, phase), output);
}
