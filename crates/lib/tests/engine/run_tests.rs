//! Pass integration tests.

#![cfg(unix)]

use etcha_lib::commands::{Command, Commands, Mode};
use etcha_lib::env::Phase;
use serial_test::serial;

use super::common::{TestEnv, file_unit};

#[tokio::test]
#[serial]
async fn change_converges_then_is_quiet() {
  let env = TestEnv::new();
  let commands: Commands = vec![file_unit("a"), file_unit("b")].into();

  let first = commands.run(&env.ctx(), env.env(), Mode::Change).await;
  assert!(first.is_success());
  assert_eq!(first.outputs.changed(), vec!["a", "b"]);
  assert!(env.exists("a"));
  assert!(env.exists("b"));

  let second = commands.run(&env.ctx(), env.env(), Mode::Change).await;
  assert!(second.is_success());
  assert!(second.outputs.changed().is_empty());
  assert_eq!(second.env.get("A_CHECK"), Some("0"));
}

#[tokio::test]
#[serial]
async fn check_reports_drift_without_changing() {
  let env = TestEnv::new();
  let commands: Commands = vec![file_unit("a")].into();

  let result = commands.run(&env.ctx(), env.env(), Mode::Check).await;

  assert!(result.is_success());
  assert_eq!(result.outputs.check_fail(), vec!["a"]);
  assert!(!env.exists("a"));
}

#[tokio::test]
#[serial]
async fn later_units_read_result_variables() {
  let env = TestEnv::new();
  let commands: Commands = vec![
    Command::new("a")
      .with_check("echo missing; false")
      .with_change("echo installed")
      .with_env_prefix("A"),
    Command::new("b")
      .with_change("echo \"$A_CHECK $A_CHECK_OUT $A_CHANGE $A_CHANGE_OUT\" > \"$DIR/report\"")
      .always(),
  ]
  .into();

  let result = commands.run(&env.ctx(), env.env(), Mode::Change).await;

  assert!(result.is_success());
  assert_eq!(env.read("report").trim(), "1 missing 0 installed");
}

#[tokio::test]
#[serial]
async fn remove_runs_in_reverse_order() {
  let env = TestEnv::new();
  let unit = |id: &str| Command::new(id).with_remove(format!("echo {} >> \"$DIR/log\"", id));
  let commands: Commands = vec![unit("a"), unit("b"), unit("c")].into();

  let result = commands.run(&env.ctx(), env.env(), Mode::Remove).await;

  assert!(result.is_success());
  assert_eq!(env.read("log"), "c\nb\na\n");
}

#[tokio::test]
#[serial]
async fn revision_diff_removes_dropped_units() {
  let env = TestEnv::new();
  let old: Commands = vec![file_unit("a"), file_unit("b")].into();
  old.run(&env.ctx(), env.env(), Mode::Change).await;

  let new: Commands = vec![file_unit("a")].into();
  let diff = new.diff(&old);
  assert_eq!(diff.remove.ids(), vec!["b"]);

  let removed = diff.remove.run(&env.ctx(), env.env(), Mode::Remove).await;
  let changed = diff.change.run(&env.ctx(), env.env(), Mode::Change).await;

  assert!(removed.is_success());
  assert!(changed.is_success());
  assert!(env.exists("a"));
  assert!(!env.exists("b"));
  assert!(changed.outputs.changed().is_empty());
  assert!(!changed.outputs[0].checked);
}

#[tokio::test]
#[serial]
async fn failure_rolls_back_through_on_fail() {
  let env = TestEnv::new();
  let commands: Commands = vec![
    Command::new("rollback")
      .with_change("touch \"$DIR/rolled_back\"")
      .with_env_prefix("ROLLBACK"),
    Command::new("deploy")
      .with_change("echo deploy broke >&2; exit 4")
      .always()
      .on_fail(["rollback", "etcha:deploy_failed"]),
    file_unit("after"),
  ]
  .into();
  commands.validate().unwrap();

  let result = commands.run(&env.ctx(), env.env(), Mode::Change).await;

  let err = result.error.expect("deploy should fail");
  assert_eq!(err.id, "deploy");
  assert_eq!(err.phase, Phase::Change);
  assert!(err.to_string().contains("deploy broke"));
  assert!(env.exists("rolled_back"));
  assert!(!env.exists("after"));
  assert_eq!(result.env.get("_CHANGE_OUT"), Some("deploy broke"));
  assert_eq!(result.outputs.events().names(), vec!["deploy_failed"]);
}

#[tokio::test]
#[serial]
async fn on_change_restarts_earlier_unit() {
  let env = TestEnv::new();
  let commands: Commands = vec![
    Command::new("service")
      .with_check("test -f \"$DIR/running\"")
      .with_change("echo start >> \"$DIR/service_log\"; touch \"$DIR/running\""),
    Command::new("config")
      .with_check("test -f \"$DIR/config\"")
      .with_change("touch \"$DIR/config\"")
      .on_change(["service", "etcha:stdout"]),
  ]
  .into();
  commands.validate().unwrap();

  let result = commands.run(&env.ctx(), env.env(), Mode::Change).await;

  assert!(result.is_success());
  assert_eq!(env.read("service_log"), "start\nstart\n");
  assert_eq!(result.outputs.changed(), vec!["service", "config", "service"]);
}
