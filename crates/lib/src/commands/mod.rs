//! Command lists and the reconciliation engine.
//!
//! A command list is applied in passes. Each unit checks whether the system
//! has converged and runs its change script only when it has not; a remove
//! pass tears units down in reverse order. Units talk to each other through
//! result variables in a shared environment overlay and through triggers.
//!
//! # Lifecycle
//!
//! - [`Commands::validate`] - reject lists that cannot run before accepting them
//! - [`Commands::diff`] - compute the change and remove sets against the previous revision
//! - [`Commands::run`] - execute a pass in change, check or remove mode
//! - [`Commands::test`] - assert the list converges and tears down cleanly
//!
//! # Submodules
//!
//! - [`diff`] - Revision diff
//! - [`harness`] - Convergence self-test
//! - [`run`] - Unit state machine and pass orchestration
//! - [`validate`] - Static trigger graph checks

pub mod diff;
pub mod harness;
pub mod run;
mod types;
pub mod validate;

pub use diff::CommandsDiff;
pub use harness::{TestFailure, TestResults};
pub use run::{CommandError, EventStreams, RunContext, RunResult};
pub use types::*;
pub use validate::{ValidateError, ValidationReport, Violation};
