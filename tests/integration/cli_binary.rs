use std::process::{Command, Output};

use level_launcher::launcher::TARGET_SCRIPT;
use serde_json::Value;

use crate::common::{running_as_root, BINARY_PATH};

fn run_binary(args: &[&str]) -> Output {
    Command::new(BINARY_PATH)
        .args(args)
        .env("LEVEL_LAUNCHER_LOG", "error")
        .output()
        .expect("launcher binary should start")
}

/// The structured report is the only stderr line that is a JSON object.
fn error_report(output: &Output) -> Value {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr
        .lines()
        .find(|line| line.starts_with('{'))
        .unwrap_or_else(|| panic!("no JSON report on stderr: {stderr}"));
    serde_json::from_str(line).expect("report should be valid JSON")
}

#[test]
fn injection_attempt_exits_with_invalid_level() {
    let output = run_binary(&["; rm -rf /"]);

    assert_eq!(output.status.code(), Some(65));
    let report = error_report(&output);
    assert_eq!(report["code"], "invalid_level");
    assert_eq!(report["stage"], "validate");
    assert_eq!(report["before_privileged_action"], Value::Bool(true));
    assert_eq!(report["exit_code"], Value::from(65));
    assert!(report["details"].get("exit_code").is_none());
    assert!(output.stdout.is_empty());
}

#[test]
fn second_level_is_a_usage_error() {
    let output = run_binary(&["3", "4"]);

    assert_eq!(output.status.code(), Some(64));
    assert_eq!(error_report(&output)["code"], "usage");
}

#[test]
fn dry_run_prints_argv_without_elevating() {
    let output = run_binary(&["--dry-run", "2"]);

    assert!(output.status.success(), "dry run failed: {output:?}");
    let plan: Value = serde_json::from_slice(&output.stdout).expect("dry run prints JSON");
    assert_eq!(plan["argv"], serde_json::json!([TARGET_SCRIPT, "2"]));
    assert_eq!(plan["level"], "2");
}

#[test]
fn dry_run_without_level_uses_default() {
    let output = run_binary(&["--dry-run"]);

    assert!(output.status.success(), "dry run failed: {output:?}");
    let plan: Value = serde_json::from_slice(&output.stdout).expect("dry run prints JSON");
    assert_eq!(plan["level"], "3");
    assert_eq!(plan["level_defaulted"], Value::Bool(true));
}

#[test]
fn unprivileged_run_fails_at_elevation() {
    if running_as_root() {
        eprintln!("Skipping privilege failure test because the test runs as root");
        return;
    }

    let output = run_binary(&["3"]);

    assert_eq!(output.status.code(), Some(77), "output: {output:?}");
    let report = error_report(&output);
    assert_eq!(report["code"], "privilege_escalation_failed");
    assert_eq!(report["stage"], "elevate");
    assert_eq!(report["before_privileged_action"], Value::Bool(false));
}

#[test]
fn help_exits_successfully() {
    let output = run_binary(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("LEVEL"), "help: {stdout}");
}
