//! Integration tests for `testnode config` and configuration loading.

#![allow(clippy::expect_used)]

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn testnode() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("testnode"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("TESTNODE_CONFIG");
    cmd
}

fn write_config(dir: &TempDir, yaml: &str) -> PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, yaml).expect("write config");
    path
}

#[test]
fn test_config_prints_effective_yaml() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "runtime_process: node\nports:\n  base: 30000\n  count: 5\n");

    testnode()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("runtime_process: node"))
        .stdout(predicate::str::contains("base: 30000"))
        .stdout(predicate::str::contains("provider: multipass"));
}

#[test]
fn test_config_json_is_valid() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "provider: multipass\n");

    let output = testnode()
        .arg("--config")
        .arg(&path)
        .args(["config", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["config"]["ports"]["base"], 20000);
    assert_eq!(value["config"]["runtime_process"], "java");
}

#[test]
fn test_config_env_var_is_honoured() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "launch_timeout_secs: 42\n");

    testnode()
        .env("TESTNODE_CONFIG", &path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("launch_timeout_secs: 42"));
}

#[test]
fn test_invalid_runtime_process_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "runtime_process: \"java; rm -rf /\"\n");

    testnode()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid runtime process name"));
}

#[test]
fn test_static_provider_without_hosts_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "provider: static\n");

    testnode()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("static_hosts"));
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().expect("tempdir");

    testnode()
        .arg("--config")
        .arg(dir.path().join("absent.yaml"))
        .arg("config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}
