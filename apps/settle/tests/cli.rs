#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;

fn settle() -> Command {
    let mut cmd = Command::cargo_bin("settle").unwrap();
    cmd.env_remove("SETTLE_INTERVAL_MS")
        .env_remove("SETTLE_TIMEOUT_MS")
        .env_remove("SETTLE_CI_DELAY_MS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn until_succeeds_for_passing_command() {
    settle()
        .args(["until", "--interval-ms", "10", "--timeout-ms", "1000", "--", "true"])
        .assert()
        .success();
}

#[test]
fn until_times_out_with_exit_code_one() {
    settle()
        .args([
            "until",
            "--interval-ms",
            "10",
            "--timeout-ms",
            "50",
            "--description",
            "operator ready",
            "--",
            "false",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timed out after"))
        .stderr(predicate::str::contains("operator ready"));
}

#[test]
fn until_waits_for_file_to_appear() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("ready");
    let script = format!(
        "if [ -f {m} ]; then exit 0; else touch {m}; exit 1; fi",
        m = marker.display()
    );

    settle()
        .args(["until", "--interval-ms", "10", "--timeout-ms", "2000", "--", "sh", "-c"])
        .arg(script)
        .assert()
        .success();
}

#[test]
fn zero_interval_is_configuration_error() {
    settle()
        .args(["until", "--interval-ms", "0", "--timeout-ms", "100", "--", "true"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("poll interval must be greater than zero"));
}

#[test]
fn timeout_below_interval_is_configuration_error() {
    settle()
        .args(["until", "--interval-ms", "500", "--timeout-ms", "100", "--", "true"])
        .assert()
        .code(2);
}

#[test]
fn unknown_profile_is_configuration_error() {
    settle()
        .args(["until", "--profile", "pods", "--", "true"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown wait profile: pods"));
}

#[test]
fn profile_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("settle.yaml");
    std::fs::write(
        &config,
        "profiles:\n  quick:\n    interval_ms: 10\n    timeout_ms: 40\n    description: quick check\n",
    )
    .unwrap();

    settle()
        .args(["until", "--config"])
        .arg(&config)
        .args(["--profile", "quick", "--", "false"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("quick check"));
}

#[test]
fn env_override_applies() {
    settle()
        .env("SETTLE_INTERVAL_MS", "10")
        .env("SETTLE_TIMEOUT_MS", "30")
        .args(["until", "--", "false"])
        .assert()
        .code(1);
}

#[test]
fn missing_program_aborts_as_condition_error() {
    settle()
        .args([
            "until",
            "--interval-ms",
            "10",
            "--timeout-ms",
            "1000",
            "--",
            "settle-test-no-such-program",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("failed to run settle-test-no-such-program"));
}

#[test]
fn retry_gives_up_after_attempts() {
    settle()
        .args([
            "retry",
            "--retries",
            "2",
            "--delay-ms",
            "1",
            "--message",
            "Unable to scale syndesis-operator",
            "--",
            "false",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Unable to scale syndesis-operator (gave up after 3 attempts)",
        ));
}

#[test]
fn retry_succeeds_for_passing_command() {
    settle()
        .args(["retry", "--retries", "0", "--", "true"])
        .assert()
        .success();
}

#[test]
fn json_logs_go_to_stderr() {
    settle()
        .args([
            "-v",
            "--log-format",
            "json",
            "until",
            "--interval-ms",
            "10",
            "--timeout-ms",
            "100",
            "--",
            "true",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("\"level\":\"DEBUG\""));
}

#[test]
fn command_is_required() {
    settle().args(["until"]).assert().failure();
}

#[test]
fn interrupt_cancels_wait_with_exit_code_130() {
    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("settle"))
        .args(["until", "--interval-ms", "10000", "--timeout-ms", "60000", "--", "false"])
        .env_remove("SETTLE_INTERVAL_MS")
        .env_remove("SETTLE_TIMEOUT_MS")
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Let the signal handler install and the first evaluation finish.
    std::thread::sleep(Duration::from_millis(500));
    let killed = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(130));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cancelled"));
}
