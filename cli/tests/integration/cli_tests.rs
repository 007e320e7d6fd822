//! Integration tests for argument parsing and error reporting.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn testnode() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("testnode"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("TESTNODE_CONFIG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    testnode().assert().code(2).stderr(predicate::str::contains(
        "Ephemeral remote nodes for running tests",
    ));
}

#[test]
fn test_cli_help_lists_commands() {
    testnode()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    testnode()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("testnode"));
}

#[test]
fn test_run_requires_a_command() {
    testnode()
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("<COMMAND>"));
}

#[test]
fn test_run_help_documents_port_flag() {
    testnode()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--ports"))
        .stdout(predicate::str::contains("--keep"));
}

#[test]
fn test_unknown_subcommand_fails() {
    testnode()
        .arg("provision")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_destroy_refuses_foreign_multipass_instance() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, "provider: multipass\n").expect("write config");

    testnode()
        .arg("--config")
        .arg(&config)
        .args(["destroy", "primary"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_json_mode_reports_errors_as_json() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, "provider: multipass\n").expect("write config");

    let output = testnode()
        .arg("--config")
        .arg(&config)
        .args(["--json", "destroy", "primary"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "command_failed");
}
