//! CLI integration tests

use std::process::{Command, Output};

fn monctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_monctl"))
        .args(args)
        .env_remove("MONCTL_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = monctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("cluster monitoring"), "Should show about text");
    assert!(stdout.contains("query"), "Should show query command");
    assert!(stdout.contains("meter"), "Should show meter command");
    assert!(stdout.contains("status"), "Should show status command");
    assert!(stdout.contains("config"), "Should show config command");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("--format"), "Should show format option");
}

#[test]
fn test_cli_version() {
    let output = monctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("monctl"), "Should show binary name");
}

#[test]
fn test_query_help_lists_request_options() {
    let output = monctl(&["query", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Query help should succeed");
    for option in [
        "--time",
        "--start",
        "--end",
        "--step",
        "--sort-metric",
        "--sort-type",
        "--page",
        "--limit",
        "--metrics-filter",
        "--resources-filter",
        "--namespace",
        "--workload",
        "--component",
        "--applications",
    ] {
        assert!(stdout.contains(option), "Should show {option} option");
    }
}

#[test]
fn test_meter_help_lists_price_options() {
    let output = monctl(&["meter", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Meter help should succeed");
    assert!(stdout.contains("--cpu-per-core-per-hour"));
    assert!(stdout.contains("--pvc-per-gigabytes-per-hour"));
    assert!(stdout.contains("--currency-unit"));
}

#[test]
fn test_unknown_level_is_rejected() {
    let output = monctl(&["query", "galaxies"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unknown level should fail");
    assert!(stderr.contains("galaxies"), "Should name the bad level");
}

#[test]
fn test_time_conflicts_with_range() {
    let output = monctl(&[
        "query",
        "cluster",
        "--time",
        "1585831995",
        "--start",
        "1585830000",
        "--end",
        "1585839999",
    ]);

    assert!(!output.status.success(), "time with a range should fail");
}

#[test]
fn test_start_requires_end() {
    let output = monctl(&["query", "cluster", "--start", "1585830000"]);
    assert!(!output.status.success(), "start without end should fail");
}

#[test]
fn test_invalid_command() {
    let output = monctl(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_missing_level() {
    let output = monctl(&["query"]);
    assert!(!output.status.success(), "Query without a level should fail");
}
