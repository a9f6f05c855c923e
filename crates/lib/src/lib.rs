//! etcha-lib: Command reconciliation engine
//!
//! This crate provides the core of etcha:
//! - `Command`/`Commands`: idempotent check/change/remove units and ordered lists of them
//! - `Output`/`Outputs`: per-unit results and the views callers act on
//! - `Executor`: the boundary that turns a script into captured output
//! - `Config`: default execution settings and environment

pub mod commands;
pub mod config;
pub mod env;
pub mod exec;
pub mod observe;
pub mod output;
pub mod util;
