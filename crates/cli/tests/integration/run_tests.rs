//! Run, check, remove and test command integration tests.

use predicates::prelude::*;
use serial_test::serial;

use super::common::{TestEnv, fixture_path};

#[test]
#[serial]
fn run_converges() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("run")
    .arg(fixture_path("files.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("Run complete!"))
    .stdout(predicate::str::contains("second_changed"));

  assert!(env.exists("first"));
  assert_eq!(env.read("second").trim(), "0");
}

#[test]
#[serial]
fn check_reports_drift_then_passes() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("check")
    .arg(fixture_path("files.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("need changes"));
  assert!(!env.exists("first"));

  env.etcha_cmd().arg("run").arg(fixture_path("files.json")).assert().success();

  env
    .etcha_cmd()
    .arg("check")
    .arg(fixture_path("files.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("All checks passed"));
}

#[test]
#[serial]
fn run_with_old_removes_dropped_commands() {
  let env = TestEnv::new();
  env.etcha_cmd().arg("run").arg(fixture_path("files.json")).assert().success();

  env
    .etcha_cmd()
    .arg("run")
    .arg(fixture_path("files_v2.json"))
    .arg("--old")
    .arg(fixture_path("files.json"))
    .assert()
    .success();

  assert!(env.exists("first"));
  assert!(!env.exists("second"));
}

#[test]
#[serial]
fn remove_tears_down() {
  let env = TestEnv::new();
  env.etcha_cmd().arg("run").arg(fixture_path("files.json")).assert().success();

  env
    .etcha_cmd()
    .arg("remove")
    .arg(fixture_path("files.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("Remove complete!"));

  assert!(!env.exists("first"));
  assert!(!env.exists("second"));
}

#[test]
#[serial]
fn failing_command_runs_on_fail_and_exits_nonzero() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("run")
    .arg(fixture_path("failing.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("change failed for broken"))
    .stderr(predicate::str::contains("broken on purpose"));

  assert!(env.exists("cleaned"));
  assert!(!env.exists("unreached"));
}

#[test]
#[serial]
fn run_json_output() {
  let env = TestEnv::new();

  let output = env
    .etcha_cmd()
    .arg("run")
    .arg(fixture_path("files.json"))
    .arg("--json")
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["mode"], "change");
  assert_eq!(json["outputs"].as_array().unwrap().len(), 2);
  assert_eq!(json["outputs"][0]["id"], "first");
  assert_eq!(json["outputs"][0]["changed"], true);
  assert_eq!(json["events"][0]["name"], "second_changed");
  assert!(json["error"].is_null());
}

#[test]
#[serial]
fn env_flag_reaches_scripts() {
  let env = TestEnv::new();
  let file = env.write_file(
    "commands.json",
    r#"[{"id": "greet", "always": true, "change": "echo \"$GREETING\" > \"$DIR/greeting\""}]"#,
  );

  env
    .etcha_cmd()
    .arg("run")
    .arg(&file)
    .arg("--env")
    .arg("GREETING=hello")
    .assert()
    .success();

  assert_eq!(env.read("greeting").trim(), "hello");
}

#[test]
#[serial]
fn config_sets_exec_defaults() {
  let env = TestEnv::new();
  let config = env.write_file(
    "config.json",
    r#"{"exec": {"command": "/bin/sh -e -c"}, "env": {"STAGE": "test"}}"#,
  );
  let file = env.write_file(
    "commands.json",
    r#"[{"id": "strict", "always": true, "change": "false; echo \"$STAGE\" > \"$DIR/stage\""}]"#,
  );

  env
    .etcha_cmd()
    .arg("run")
    .arg(&file)
    .arg("--config")
    .arg(&config)
    .assert()
    .failure();

  assert!(!env.exists("stage"));
}

#[test]
#[serial]
fn test_passes_for_converging_commands() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("test")
    .arg(fixture_path("files.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("All 2 commands converged"));

  assert!(!env.exists("first"));
}

#[test]
#[serial]
fn test_reports_incomplete_teardown() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("test")
    .arg(fixture_path("leaky.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("leaky: check did not fail after remove"));
}

#[test]
#[serial]
fn builtin_events_write_change_output() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("run")
    .arg(fixture_path("announce.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("announced-change"))
    .stdout(predicate::str::contains("complained-change").not())
    .stderr(predicate::str::contains("complained-change"))
    .stderr(predicate::str::contains("announced-change").not());
}

#[test]
#[serial]
fn json_output_stays_parseable_with_stdout_event() {
  let env = TestEnv::new();

  let output = env
    .etcha_cmd()
    .arg("run")
    .arg(fixture_path("announce.json"))
    .arg("--json")
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let names: Vec<&str> = json["events"]
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["name"].as_str().unwrap())
    .collect();
  assert_eq!(names, vec!["done", "stderr", "stdout"]);

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("announced-change"));
  assert!(stderr.contains("complained-change"));
}
