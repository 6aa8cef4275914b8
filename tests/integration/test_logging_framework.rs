use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BIN: &str = "dagboard";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn inspect_in(workspace: &Path) -> Command {
    let mut cmd = Command::cargo_bin(BIN).expect("binary should build");
    cmd.current_dir(workspace)
        .env_remove("RUST_LOG")
        .env_remove("DAGBOARD_LOG_DIR")
        .env_remove("DAGBOARD_LOG_CONSOLE")
        .arg("inspect")
        .arg(fixture("workflow.json"))
        .arg("--workspace")
        .arg(workspace);
    cmd
}

fn write_logging_toml(workspace: &Path, body: &str) {
    let dir = workspace.join(".dagboard").join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("logging.toml"), body).unwrap();
}

#[test]
fn test_file_sink_lands_in_workspace() {
    let workspace = TempDir::new().unwrap();
    inspect_in(workspace.path()).assert().success();

    let log = fs::read_to_string(
        workspace
            .path()
            .join(".dagboard")
            .join("logs")
            .join("dagboard.log"),
    )
    .unwrap();
    assert!(log.contains("workflow definition loaded"), "log was: {}", log);
    assert!(log.contains("INFO"));
    assert!(!log.contains("logging initialized"));
}

#[test]
fn test_interactive_commands_log_to_stderr_only() {
    let workspace = TempDir::new().unwrap();
    inspect_in(workspace.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("workflow definition loaded"))
        .stdout(predicate::str::contains("workflow definition loaded").not());
}

#[test]
fn test_console_can_be_silenced_from_env() {
    let workspace = TempDir::new().unwrap();
    inspect_in(workspace.path())
        .env("DAGBOARD_LOG_CONSOLE", "none")
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_invalid_console_value_disables_logging_but_runs() {
    let workspace = TempDir::new().unwrap();
    inspect_in(workspace.path())
        .env("DAGBOARD_LOG_CONSOLE", "speaker")
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning: logging disabled"))
        .stdout(predicate::str::contains("nightly-orders"));
}

#[test]
fn test_workspace_logging_toml_is_honored() {
    let workspace = TempDir::new().unwrap();
    write_logging_toml(
        workspace.path(),
        "[logging]\nlog_dir = \"audit\"\ndefault_level = \"debug\"\nconsole_output = \"none\"\n",
    );

    inspect_in(workspace.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    let log = fs::read_to_string(workspace.path().join("audit").join("dagboard.log")).unwrap();
    assert!(log.contains("logging initialized"));
    assert!(log.contains("workflow definition loaded"));
    assert!(!workspace.path().join(".dagboard").join("logs").exists());
}

#[test]
fn test_rust_log_overrides_configured_level() {
    let workspace = TempDir::new().unwrap();
    inspect_in(workspace.path())
        .env("RUST_LOG", "warn")
        .env("DAGBOARD_LOG_CONSOLE", "none")
        .assert()
        .success();

    let log = fs::read_to_string(
        workspace
            .path()
            .join(".dagboard")
            .join("logs")
            .join("dagboard.log"),
    )
    .unwrap();
    assert!(!log.contains("workflow definition loaded"));
}

#[test]
fn test_log_dir_outside_workspace_is_refused() {
    let workspace = TempDir::new().unwrap();
    write_logging_toml(workspace.path(), "[logging]\nlog_dir = \"../escape\"\n");

    inspect_in(workspace.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("resolves outside"));
}

#[test]
fn test_failures_are_logged_to_file() {
    let workspace = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin(BIN).expect("binary should build");
    cmd.current_dir(workspace.path())
        .env_remove("RUST_LOG")
        .env_remove("DAGBOARD_LOG_DIR")
        .env("DAGBOARD_LOG_CONSOLE", "none")
        .arg("check")
        .arg(fixture("cyclic.json"))
        .arg("--workspace")
        .arg(workspace.path())
        .assert()
        .failure();

    let log = fs::read_to_string(
        workspace
            .path()
            .join(".dagboard")
            .join("logs")
            .join("dagboard.log"),
    )
    .unwrap();
    assert!(log.contains("ERROR"));
    assert!(log.contains("dependencies rejected"));
}
