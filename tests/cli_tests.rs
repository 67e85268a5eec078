#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Binary isolated from the user's config and session
fn m365(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("m365").unwrap();
    cmd.env("M365_CLI_HOME", home.path())
        .env_remove("M365_ACCESS_TOKEN")
        .env_remove("M365_GRAPH_URL")
        .env_remove("M365_TELEMETRY_ENDPOINT")
        .env_remove("RUST_LOG");
    cmd
}

/// Test that the CLI shows help
#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    m365(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Microsoft 365"));
}

/// Test that version flag works
#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    m365(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("m365"));
}

/// Test that unknown commands fail gracefully
#[test]
fn test_unknown_command() {
    let home = TempDir::new().unwrap();
    m365(&home).arg("unknown-command").assert().failure();
}

/// Test that command help lists the schema options
#[test]
fn test_command_help_lists_options() {
    let home = TempDir::new().unwrap();
    m365(&home)
        .args(["spo", "web", "set", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--headerLayout"))
        .stdout(predicate::str::contains("--searchScope"));

    m365(&home)
        .args(["teams", "user", "app", "list", "--userId", "x", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--userName"));
}

/// Test that validation failures exit with code 1 before any request
#[test]
fn test_validation_failure() {
    let home = TempDir::new().unwrap();
    m365(&home)
        .args(["spo", "web", "set", "--url", "foo", "--title", "x"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("https URL"));

    m365(&home)
        .args([
            "teams",
            "user",
            "app",
            "list",
            "--userId",
            "5c705288-ed7f-44fc-af0a-ac164419901c",
            "--userName",
            "john@contoso.com",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("exactly one of"));
}

/// Test that commands without passthrough reject unknown options
#[test]
fn test_unknown_option_rejected() {
    let home = TempDir::new().unwrap();
    m365(&home)
        .args(["todo", "task", "add", "--title", "x", "--listId", "y", "--foo", "bar"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Option foo is not supported"));
}

/// Test that commands fail without a session
#[test]
fn test_requires_login() {
    let home = TempDir::new().unwrap();
    m365(&home)
        .args(["todo", "task", "add", "--title", "x", "--listId", "y"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("m365 auth login"));
}

/// Test settings round-trip through the config file
#[test]
fn test_config_set_and_get() {
    let home = TempDir::new().unwrap();
    m365(&home)
        .args(["config", "set", "settings.output", "text"])
        .assert()
        .success();
    m365(&home)
        .args(["--output", "json", "config", "get", "settings.output"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"text\""));
    m365(&home)
        .args(["config", "set", "settings.output", "xml"])
        .assert()
        .code(1);
}

/// Test auth status without a session
#[test]
fn test_auth_status_logged_out() {
    let home = TempDir::new().unwrap();
    m365(&home)
        .args(["auth", "status"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Logged out"));
}

#[tokio::test]
async fn test_todo_task_add_against_mock_graph() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/todo/lists"))
        .and(query_param("$filter", "displayName eq 'Tasks List'"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [{"id": "list-1"}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/me/todo/lists/list-1/tasks"))
        .and(body_json(json!({
            "title": "New task",
            "body": {"contentType": "text"},
            "dueDateTime": {"dateTime": "2023-01-01", "timeZone": "Etc/GMT"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "task-1",
            "title": "New task"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = m365(&home)
        .env("M365_GRAPH_URL", server.uri())
        .env("M365_ACCESS_TOKEN", "test-token")
        .args([
            "todo",
            "task",
            "add",
            "--title",
            "New task",
            "--listName",
            "Tasks List",
            "--dueDateTime",
            "2023-01-01",
            "--debug",
        ])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "m365 failed. status={:?}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    let task: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(task["id"], "task-1");
}

#[tokio::test]
async fn test_missing_task_list_exits_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/todo/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    m365(&home)
        .env("M365_GRAPH_URL", server.uri())
        .env("M365_ACCESS_TOKEN", "test-token")
        .args(["todo", "task", "add", "--title", "x", "--listName", "Nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("The specified task list does not exist"));
}

#[tokio::test]
async fn test_user_app_list_text_output() {
    let server = MockServer::start().await;
    let user_id = "5c705288-ed7f-44fc-af0a-ac164419901c";
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/teamwork/installedApps", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "installation-1",
                "teamsAppDefinition": {
                    "id": "definition-1",
                    "teamsAppId": "app-1",
                    "displayName": "Whiteboard",
                    "version": "1.0.0"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    m365(&home)
        .env("M365_GRAPH_URL", server.uri())
        .env("M365_ACCESS_TOKEN", "test-token")
        .args(["teams", "user", "app", "list", "--userId", user_id, "--output", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Whiteboard"))
        .stdout(predicate::str::contains("appId"))
        .stdout(predicate::str::contains("definition-1").not());
}
