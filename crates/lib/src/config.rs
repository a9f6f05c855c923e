//! Engine configuration and command list files.
//!
//! # Example Config File
//!
//! ```json
//! {
//!   "exec": {
//!     "allowOverride": true,
//!     "command": "/bin/bash -e -c",
//!     "workDir": "/var/lib/etcha"
//!   },
//!   "env": {
//!     "ENVIRONMENT": "prod"
//!   }
//! }
//! ```
//!
//! Command list files are a JSON array of units, see
//! [`Command`](crate::commands::Command).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::commands::Commands;
use crate::env::EnvVars;
use crate::exec::ExecConfig;

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
  /// Default execution settings for every script.
  pub exec: ExecConfig,
  /// Initial environment overlay for every pass.
  pub env: EnvVars,
}

/// Errors that can occur when loading configuration or command files.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// Failed to read the file.
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to parse the file as JSON.
  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

impl Config {
  /// Load configuration from a JSON file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    read_json(path)
  }

  /// Load configuration from `path`, or use defaults if none is given.
  pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
    match path {
      Some(path) => Self::load(path),
      None => Ok(Self::default()),
    }
  }
}

/// Load a command list from a JSON file.
pub fn load_commands(path: &Path) -> Result<Commands, ConfigError> {
  read_json(path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
  debug!(path = %path.display(), "loading");

  let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })
}
