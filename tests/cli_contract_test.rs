use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const RP_VARS: [&str; 15] = [
    "RP_ENDPOINT",
    "RP_PROJECT_NAME",
    "RP_API_KEY",
    "RP_TOKEN",
    "RP_LAUNCH",
    "RP_DESCRIPTION",
    "RP_ATTRIBUTES",
    "RP_MODE",
    "RP_LAUNCH_ID",
    "RP_ARTIFACTS_PATH",
    "RP_DISABLED",
    "RP_DISABLE_UPLOAD_ATTACHMENTS",
    "RP_SKIPPED_ISSUE",
    "RP_LOG_LAUNCH_LINK",
    "DETOX_RERUN_INDEX",
];

fn get_binary() -> String {
    env!("CARGO_BIN_EXE_portal-reporter").to_string()
}

/// Run the binary in `dir` with no ambient configuration
fn run_in(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(get_binary());
    command.current_dir(dir).env("HOME", dir).args(args);
    for var in RP_VARS {
        command.env_remove(var);
    }
    command.output().expect("Failed to execute portal-reporter")
}

const EVENTS: &str = r#"{"event":"run_start"}
{"event":"test_result","testFilePath":"cart.test.js","testResults":[{"ancestorTitles":["Cart","totals"],"title":"sums","fullName":"Cart totals sums","status":"passed","duration":2}]}
{"event":"run_complete"}
"#;

#[test]
fn test_dry_run_prints_tree() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("results.jsonl"), EVENTS).unwrap();

    let output = run_in(
        temp_dir.path(),
        &["results.jsonl", "--dry-run", "--quiet", "--launch", "nightly"],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        "launch nightly\n  suite Cart\n    test totals\n      step sums [PASSED]\n"
    );
}

#[test]
fn test_dry_run_with_summary() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("results.jsonl"), EVENTS).unwrap();

    let output = run_in(temp_dir.path(), &["results.jsonl", "--dry-run"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✅ PASSED (1 passed in 2ms)"));
    assert!(stdout.contains("Dry Run: Enabled"));
}

#[test]
fn test_missing_project_fails_without_dry_run() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("results.jsonl"), EVENTS).unwrap();

    let output = run_in(temp_dir.path(), &["results.jsonl", "--quiet"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Project name is required"));
}

#[test]
fn test_disabled_run_succeeds_without_credentials() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("results.jsonl"), EVENTS).unwrap();

    let output = run_in(temp_dir.path(), &["results.jsonl", "--disable", "--quiet"]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_init_config_writes_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_in(temp_dir.path(), &["--init-config", "portal.toml"]);

    assert!(output.status.success());
    let content = fs::read_to_string(temp_dir.path().join("portal.toml")).unwrap();
    assert!(content.contains("[portal]"));
    assert!(content.contains("endpoint = \"http://localhost:8080/api/v1\""));
}

#[test]
fn test_config_file_is_read_from_working_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("results.jsonl"), EVENTS).unwrap();
    fs::write(
        temp_dir.path().join(".portalrc.toml"),
        "[portal]\nlaunch = \"from file\"\n",
    )
    .unwrap();

    let output = run_in(temp_dir.path(), &["results.jsonl", "--dry-run", "--quiet"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("launch from file\n"));
}
