//! CLI integration tests

use std::process::Command;

fn run_cli(args: &[&str]) -> std::process::Output {
    let mut full = vec!["run", "-q", "-p", "mediscan-cli", "--"];
    full.extend_from_slice(args);
    Command::new("cargo")
        .args(full)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("MediScan prediction service"),
        "Should show app name"
    );
    assert!(stdout.contains("models"), "Should show models command");
    assert!(stdout.contains("schema"), "Should show schema command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("register"), "Should show register command");
    assert!(stdout.contains("login"), "Should show login command");
    assert!(stdout.contains("train"), "Should show train command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run_cli(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("mediscan"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = run_cli(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--field"), "Should show field option");
    assert!(stdout.contains("--input"), "Should show input option");
}

/// Test train subcommand help
#[test]
fn test_train_help() {
    let output = run_cli(&["train", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Train help should succeed");
    assert!(stdout.contains("--data-dir"), "Should show data-dir option");
    assert!(stdout.contains("--models-dir"), "Should show models-dir option");
}

/// Test that an unknown model key is rejected before any request is made
#[test]
fn test_unknown_disease_rejected() {
    let output = run_cli(&["predict", "kidney", "-f", "age=40"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unknown model should fail");
    assert!(stderr.contains("unknown model key"), "Should explain the error");
}
