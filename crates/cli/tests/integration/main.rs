//! CLI integration tests.
//!
//! Each test runs the etcha binary against a fixture command list inside an
//! isolated temporary directory exported to scripts as `$DIR`.

#![cfg(unix)]

mod run_tests;
mod validate_tests;
