//! Validate and diff command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, fixture_path};

#[test]
fn validate_accepts_valid_list() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("validate")
    .arg(fixture_path("files.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("is valid (2 commands)"));
}

#[test]
fn validate_reports_every_violation() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("validate")
    .arg(fixture_path("invalid.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("a: onChange: b has been ran already"))
    .stderr(predicate::str::contains("b: onFail: ghost does not exist"))
    .stderr(predicate::str::contains("<no id>: missing id"));
}

#[test]
fn validate_json_output() {
  let env = TestEnv::new();

  let output = env
    .etcha_cmd()
    .arg("validate")
    .arg(fixture_path("invalid.json"))
    .arg("--json")
    .output()
    .unwrap();

  assert!(!output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["valid"], false);
  assert_eq!(json["violations"]["a"][0], "onChange: b has been ran already");
}

#[test]
fn validate_rejects_empty_list() {
  let env = TestEnv::new();
  let file = env.write_file("empty.json", "[]");

  env
    .etcha_cmd()
    .arg("validate")
    .arg(&file)
    .assert()
    .failure()
    .stderr(predicate::str::contains("no commands specified"));
}

#[test]
fn run_refuses_invalid_list() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("run")
    .arg(fixture_path("invalid.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid commands"));
}

#[test]
fn diff_shows_unchanged_and_removed() {
  let env = TestEnv::new();

  env
    .etcha_cmd()
    .arg("diff")
    .arg(fixture_path("files_v2.json"))
    .arg(fixture_path("files.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("first (unchanged)"))
    .stdout(predicate::str::contains("Remove:"))
    .stdout(predicate::str::contains("second"));
}

#[test]
fn diff_json_output() {
  let env = TestEnv::new();

  let output = env
    .etcha_cmd()
    .arg("diff")
    .arg(fixture_path("files_v2.json"))
    .arg(fixture_path("files.json"))
    .arg("--json")
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["change"][0]["id"], "first");
  assert!(json["change"][0].get("check").is_none());
  assert_eq!(json["remove"][0]["id"], "second");
}
