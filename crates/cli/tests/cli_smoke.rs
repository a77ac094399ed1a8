use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
  Command::cargo_bin("chainwright")
    .unwrap()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("deploy"))
    .stdout(predicate::str::contains("status"))
    .stdout(predicate::str::contains("actions"));
}

#[test]
fn status_with_no_manifest_reports_nothing_recorded() {
  let dir = tempfile::TempDir::new().unwrap();

  Command::cargo_bin("chainwright")
    .unwrap()
    .arg("status")
    .arg("--deployment-path")
    .arg(dir.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("No deployments recorded"));
}

#[test]
fn actions_with_no_queue_reports_none_pending() {
  let dir = tempfile::TempDir::new().unwrap();

  Command::cargo_bin("chainwright")
    .unwrap()
    .arg("actions")
    .arg("--deployment-path")
    .arg(dir.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("No pending owner actions"));
}

#[test]
fn deploy_requires_connection_arguments() {
  Command::cargo_bin("chainwright")
    .unwrap()
    .arg("deploy")
    .assert()
    .failure()
    .stderr(predicate::str::contains("--endpoint"));
}
