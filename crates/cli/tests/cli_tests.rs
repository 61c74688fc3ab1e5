//! CLI integration tests

use std::process::{Command, Output};

fn ais(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ais"))
        .args(args)
        .env_remove("AIS_API_URL")
        .output()
        .expect("Failed to execute ais")
}

#[test]
fn test_cli_help() {
    let output = ais(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("AI Scheduler"), "Should show app name");
    for command in ["predict", "nodes", "analysis", "history", "health"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("--format"), "Should show format option");
}

#[test]
fn test_cli_version() {
    let output = ais(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("ais"), "Should show binary name");
}

#[test]
fn test_predict_help() {
    let output = ais(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("<POD>"), "Should show pod argument");
    assert!(stdout.contains("--namespace"), "Should show namespace option");
}

#[test]
fn test_analysis_help() {
    let output = ais(&["analysis", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Analysis help should succeed");
    assert!(stdout.contains("<NODE>"), "Should show node argument");
    assert!(stdout.contains("--window"), "Should show window option");
    assert!(stdout.contains("24h"), "Should show default window");
}

#[test]
fn test_history_requires_node() {
    let output = ais(&["history"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "History without a node should fail");
    assert!(stderr.contains("<NODE>"), "Should name the missing argument");
}

#[test]
fn test_invalid_format_rejected() {
    let output = ais(&["--format", "yaml", "nodes"]);
    assert!(!output.status.success(), "Unknown format should fail");
}

#[test]
fn test_unreachable_api_fails() {
    let output = ais(&["--api-url", "http://127.0.0.1:1", "nodes"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unreachable API should fail");
    assert!(
        stderr.contains("Failed to send request"),
        "Should report the connection failure"
    );
}
