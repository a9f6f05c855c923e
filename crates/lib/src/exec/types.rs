//! Types for script execution.
//!
//! This module defines the error type returned by executors and the
//! configuration that selects how a script is run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env::EnvVars;

/// Errors that can occur while executing a script.
#[derive(Debug, Error)]
pub enum ExecError {
  /// The script ran and exited unsuccessfully.
  #[error("exited with code {code:?}: {output}")]
  Failed { code: Option<i32>, output: String },

  /// The pass was cancelled while the script was running.
  #[error("execution cancelled")]
  Cancelled,

  /// The configured exec command could not be parsed.
  #[error("invalid exec command: {0:?}")]
  InvalidCommand(String),

  /// I/O error while spawning or talking to the process.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ExecError {
  /// Output to report in `_OUT` variables for this failure.
  ///
  /// For a failed script this is what it printed; for anything else it is
  /// the error message.
  pub fn output(&self) -> String {
    match self {
      ExecError::Failed { output, .. } => output.clone(),
      other => other.to_string(),
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, ExecError::Cancelled)
  }
}

/// How scripts are executed.
///
/// The defaults come from the engine [`Config`](crate::config::Config); a
/// unit may carry its own `exec` block which replaces the defaults field by
/// field, but only when the defaults set `allowOverride`.
///
/// ```json
/// {
///   "allowOverride": true,
///   "command": "/bin/bash -e -o pipefail -c",
///   "env": { "LANG": "C" },
///   "workDir": "/var/lib/etcha"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecConfig {
  /// Whether units may override these settings with their own `exec`.
  pub allow_override: bool,

  /// Interpreter and leading arguments; the script is appended as the last
  /// argument. If None, uses /bin/sh -c (Unix) or powershell.exe (Windows).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub command: Option<String>,

  /// Extra environment variables for every script.
  #[serde(skip_serializing_if = "EnvVars::is_empty")]
  pub env: EnvVars,

  /// Working directory for scripts.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub work_dir: Option<String>,
}

impl ExecConfig {
  /// Resolve the settings for one unit.
  pub fn merged(&self, unit: Option<&ExecConfig>) -> ExecConfig {
    let Some(unit) = unit.filter(|_| self.allow_override) else {
      return self.clone();
    };

    ExecConfig {
      allow_override: self.allow_override,
      command: unit.command.clone().or_else(|| self.command.clone()),
      env: self.env.merged(&unit.env),
      work_dir: unit.work_dir.clone().or_else(|| self.work_dir.clone()),
    }
  }
}
