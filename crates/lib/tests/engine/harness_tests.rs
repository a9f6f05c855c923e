//! Convergence self-test integration tests.

#![cfg(unix)]

use etcha_lib::commands::{Command, Commands, TestFailure};
use serial_test::serial;

use super::common::{TestEnv, file_unit};

#[tokio::test]
#[serial]
async fn well_behaved_units_pass() {
  let env = TestEnv::new();
  let commands: Commands = vec![file_unit("a"), file_unit("b")].into();

  let results = commands.test(&env.ctx(), env.env()).await;

  assert!(results.is_empty(), "{:?}", results);
  assert!(!env.exists("a"));
  assert!(!env.exists("b"));
}

#[tokio::test]
#[serial]
async fn change_that_does_not_converge() {
  let env = TestEnv::new();
  let commands: Commands = vec![file_unit("a").with_change("echo pretending")].into();

  let results = commands.test(&env.ctx(), env.env()).await;

  assert_eq!(results.get("a").unwrap(), &vec![TestFailure::CheckAfterChange]);
}

#[tokio::test]
#[serial]
async fn remove_that_leaves_state_behind() {
  let env = TestEnv::new();
  let commands: Commands = vec![file_unit("a").with_remove("true")].into();

  let results = commands.test(&env.ctx(), env.env()).await;

  assert_eq!(results.get("a").unwrap(), &vec![TestFailure::CheckAfterRemove]);
  assert!(env.exists("a"));
}

#[tokio::test]
#[serial]
async fn failing_remove() {
  let env = TestEnv::new();
  let commands: Commands = vec![
    Command::new("b")
      .with_check("test -f \"$DIR/b\"")
      .with_change("touch \"$DIR/b\"")
      .with_remove("exit 1"),
    file_unit("a"),
  ]
  .into();

  let results = commands.test(&env.ctx(), env.env()).await;

  assert_eq!(
    results.get("b").unwrap(),
    &vec![TestFailure::RemoveFailed, TestFailure::CheckAfterRemove]
  );
  assert!(!results.contains_key("a"));
}
