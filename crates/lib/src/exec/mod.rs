//! Script execution boundary.
//!
//! The engine never spawns processes itself. Every check, change and remove
//! script is handed to an [`Executor`] together with the environment overlay
//! and the resolved [`ExecConfig`]. [`LocalExecutor`] runs scripts through a
//! local shell; tests and embedders can supply their own.
//!
//! # Submodules
//!
//! - [`cancel`] - Cancellation flag shared with in-flight scripts
//! - [`local`] - Shell subprocess executor

pub mod cancel;
pub mod local;
mod types;

use std::future::Future;

use crate::env::EnvVars;

pub use cancel::CancelToken;
pub use local::LocalExecutor;
pub use types::{ExecConfig, ExecError};

/// One script invocation.
#[derive(Debug, Clone, Copy)]
pub struct ExecRequest<'a> {
  /// Script body.
  pub script: &'a str,
  /// Variables layered on top of the process and config environment.
  pub env: &'a EnvVars,
  /// Optional data written to the script's stdin.
  pub stdin: Option<&'a str>,
  /// Resolved execution settings.
  pub exec: &'a ExecConfig,
}

/// Capability that turns a script into captured output.
///
/// Implementations return the captured output on success, and
/// [`ExecError::Failed`] carrying the captured output when the script ran but
/// failed. Dropping the returned future must abort the script.
pub trait Executor: Send + Sync {
  fn run(&self, request: &ExecRequest<'_>) -> impl Future<Output = Result<String, ExecError>> + Send;
}

impl<E: Executor> Executor for &E {
  fn run(&self, request: &ExecRequest<'_>) -> impl Future<Output = Result<String, ExecError>> + Send {
    (**self).run(request)
  }
}
