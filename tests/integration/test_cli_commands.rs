use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BIN: &str = "dagboard";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Command rooted in an empty workspace with backend env cleared.
fn dagboard(workspace: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin(BIN).expect("binary should build");
    cmd.current_dir(workspace.path())
        .env_remove("DAGBOARD_BACKEND_URL")
        .env_remove("DAGBOARD_BACKEND_TOKEN")
        .env_remove("DAGBOARD_PROJECT_CODE")
        .env_remove("DAGBOARD_LAYOUT_KIND")
        .env_remove("RUST_LOG")
        .env_remove("DAGBOARD_LOG_DIR")
        .env("DAGBOARD_LOG_CONSOLE", "none");
    cmd
}

#[test]
fn test_help_lists_workflow_commands() {
    let workspace = TempDir::new().unwrap();
    dagboard(&workspace)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("WORKFLOW COMMANDS"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_inspect_prints_tasks_and_dependencies() {
    let workspace = TempDir::new().unwrap();
    dagboard(&workspace)
        .arg("inspect")
        .arg(fixture("workflow.json"))
        .arg("--workspace")
        .arg(workspace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Workflow: nightly-orders (9921)"))
        .stdout(predicate::str::contains("Tasks: 4  Dependencies: 3  Start tasks: 1"))
        .stdout(predicate::str::contains("[104] alert SHELL (disabled)"))
        .stdout(predicate::str::contains("102 -> 103 [success]"))
        .stdout(predicate::str::contains("101 -> 102\n"));
}

#[test]
fn test_inspect_json_is_machine_readable() {
    let workspace = TempDir::new().unwrap();
    let output = dagboard(&workspace)
        .arg("inspect")
        .arg(fixture("workflow.json"))
        .arg("--json")
        .output()
        .expect("should run successfully");
    assert!(output.status.success());

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["name"], json!("nightly-orders"));
    assert_eq!(summary["start_tasks"], json!([101]));
    assert_eq!(summary["report"]["head_relations"], json!(1));
    assert_eq!(summary["dependencies"].as_array().unwrap().len(), 3);
}

#[test]
fn test_check_accepts_valid_workflow() {
    let workspace = TempDir::new().unwrap();
    dagboard(&workspace)
        .arg("check")
        .arg(fixture("workflow.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("OK: 3 dependencies valid"));
}

#[test]
fn test_check_rejects_cycle() {
    let workspace = TempDir::new().unwrap();
    dagboard(&workspace)
        .arg("check")
        .arg(fixture("cyclic.json"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("REJECTED 3 -> 1"))
        .stdout(predicate::str::contains("REJECTED 1 -> 2").not())
        .stderr(predicate::str::contains("1 of 3 dependencies rejected"));
}

#[test]
fn test_check_reports_missing_file() {
    let workspace = TempDir::new().unwrap();
    dagboard(&workspace)
        .arg("check")
        .arg(workspace.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read workflow definition"));
}

#[test]
fn test_layout_writes_save_payload() {
    let workspace = TempDir::new().unwrap();
    let output = workspace.path().join("payload.json");
    dagboard(&workspace)
        .arg("layout")
        .arg(fixture("workflow.json"))
        .args(["--kind", "grid", "--cols", "2", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let payload: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(payload["taskDefinitions"].as_array().unwrap().len(), 4);
    assert_eq!(payload["locations"].as_array().unwrap().len(), 4);

    let connects = payload["connects"].as_array().unwrap();
    assert_eq!(connects.len(), 4);
    assert_eq!(connects[0]["preTaskCode"], json!(0));
    assert_eq!(connects[0]["postTaskCode"], json!(101));
    assert!(connects
        .iter()
        .any(|c| c["preTaskCode"] == json!(102) && c["name"] == json!("failure")));
}

#[test]
fn test_layout_rejects_zero_columns() {
    let workspace = TempDir::new().unwrap();
    dagboard(&workspace)
        .arg("layout")
        .arg(fixture("workflow.json"))
        .args(["--kind", "grid", "--cols", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn test_dot_renders_graph() {
    let workspace = TempDir::new().unwrap();
    dagboard(&workspace)
        .arg("dot")
        .arg(fixture("workflow.json"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph {"))
        .stdout(predicate::str::contains("rankdir=LR"))
        .stdout(predicate::str::contains("success"))
        .stdout(predicate::str::contains("[disabled]"));
}

#[test]
fn test_broken_config_fails_early() {
    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join("dagboard.toml"),
        "[overlay]\npoll_interval_seconds = 0\n",
    )
    .unwrap();
    dagboard(&workspace)
        .arg("inspect")
        .arg(fixture("workflow.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_seconds"));
}

fn task_list() -> Value {
    json!({
        "code": 0,
        "data": {
            "taskList": [
                {"id": 31, "name": "extract", "taskCode": 101, "state": "SUCCESS"},
                {"id": 32, "name": "gate", "taskCode": 102, "state": "RUNNING_EXECUTION"}
            ]
        }
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_prints_task_states() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dolphinscheduler/projects/7/process-instances/1207/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_list()))
        .mount(&server)
        .await;

    let workspace = TempDir::new().unwrap();
    let mut cmd = dagboard(&workspace);
    cmd.env("DAGBOARD_BACKEND_URL", format!("{}/dolphinscheduler", server.uri()))
        .env("DAGBOARD_PROJECT_CODE", "7")
        .args(["status", "--instance", "1207"]);

    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert
        .success()
        .stdout(predicate::str::contains("[101] extract SUCCESS"))
        .stdout(predicate::str::contains("[102] gate RUNNING_EXECUTION"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_with_definition_follows_graph_order() {
    let server = MockServer::start().await;
    let definition: Value =
        serde_json::from_str(&std::fs::read_to_string(fixture("workflow.json")).unwrap()).unwrap();
    Mock::given(method("GET"))
        .and(path("/dolphinscheduler/projects/7/process-definition/9921"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": definition})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dolphinscheduler/projects/7/process-instances/1207/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_list()))
        .mount(&server)
        .await;

    let workspace = TempDir::new().unwrap();
    let mut cmd = dagboard(&workspace);
    cmd.env("DAGBOARD_BACKEND_URL", format!("{}/dolphinscheduler", server.uri()))
        .env("DAGBOARD_PROJECT_CODE", "7")
        .args(["status", "--instance", "1207", "--definition", "9921"]);

    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert
        .success()
        .stdout(predicate::str::contains("[101] extract SUCCESS ("))
        .stdout(predicate::str::contains("[103] load -"))
        .stdout(predicate::str::contains("[104] alert -"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_surfaces_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dolphinscheduler/projects/7/process-instances/1207/tasks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 10018, "msg": "process instance not exist"})),
        )
        .mount(&server)
        .await;

    let workspace = TempDir::new().unwrap();
    let mut cmd = dagboard(&workspace);
    cmd.env("DAGBOARD_BACKEND_URL", format!("{}/dolphinscheduler", server.uri()))
        .env("DAGBOARD_PROJECT_CODE", "7")
        .args(["status", "--instance", "1207"]);

    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert
        .failure()
        .stderr(predicate::str::contains("process instance not exist"));
}
