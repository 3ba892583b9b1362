//! CLI integration tests for tele-post

use assert_cmd::Command;
use libtelecast::types::AccountDraft;
use libtelecast::Database;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &str) -> String {
    path.replace('\\', "\\\\")
}

/// Config rooted in a temp dir; the Bot API points at a closed port
fn setup_test_env() -> (TempDir, String, String) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let config_path = root.join("config.toml");
    let db_path = root.join("telecast.db");

    let config_content = format!(
        r#"
[database]
path = "{}"

[telegram]
api_url = "http://127.0.0.1:9"
timeout_secs = 2

[storage]
avatar_dir = "{}"
session_dir = "{}"
"#,
        escape_path_for_toml(&db_path.to_string_lossy()),
        escape_path_for_toml(&root.join("avatar").to_string_lossy()),
        escape_path_for_toml(&root.join("sessions").to_string_lossy()),
    );
    fs::write(&config_path, config_content).unwrap();

    (
        temp_dir,
        config_path.to_string_lossy().to_string(),
        db_path.to_string_lossy().to_string(),
    )
}

async fn seed_account(db_path: &str, team_id: i64) -> i64 {
    let db = Database::new(db_path).await.unwrap();
    let draft = AccountDraft {
        team_id,
        pid: "-100321".to_string(),
        name: "Releases".to_string(),
        username: "releases".to_string(),
        token: "123456:ABC".to_string(),
        avatar: String::new(),
    };
    db.insert_account(&draft, 1_700_000_000).await.unwrap()
}

fn tele_post(config_path: &str) -> Command {
    let mut cmd = Command::cargo_bin("tele-post").unwrap();
    cmd.arg("--config").arg(config_path);
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be one JSON object")
}

#[test]
fn test_help_flag_output() {
    Command::cargo_bin("tele-post")
        .unwrap()
        .arg("send")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--team"))
        .stdout(predicate::str::contains("--account"))
        .stdout(predicate::str::contains("--type"))
        .stdout(predicate::str::contains("--schedule"));
}

#[test]
fn test_unknown_type_rejected_by_parser() {
    let (_temp_dir, config_path, _db_path) = setup_test_env();

    tele_post(&config_path)
        .args(["send", "--team", "1", "--account", "1", "--type", "story"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("story"));
}

#[test]
fn test_unknown_account() {
    let (_temp_dir, config_path, _db_path) = setup_test_env();

    let output = tele_post(&config_path)
        .args(["send", "--team", "1", "--account", "5", "--caption", "hi"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stdout_json(&output)["message"], "Account 5 not found");
}

#[tokio::test]
async fn test_scheduled_post_is_accepted_offline() {
    let (_temp_dir, config_path, db_path) = setup_test_env();
    let account_id = seed_account(&db_path, 2).await;

    let output = tele_post(&config_path)
        .args(["send", "--team", "2", "--type", "photo", "--schedule"])
        .args(["--account", &account_id.to_string()])
        .args(["--advance", r#"{"time_post":1900000000}"#])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["status"], "success");
    assert_eq!(json["type"], "photo");
}

#[tokio::test]
async fn test_invalid_advance_json() {
    let (_temp_dir, config_path, db_path) = setup_test_env();
    let account_id = seed_account(&db_path, 2).await;

    let output = tele_post(&config_path)
        .args(["send", "--team", "2", "--schedule", "--advance", "{not json"])
        .args(["--account", &account_id.to_string()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout_json(&output)["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid --advance JSON"));
}

#[tokio::test]
async fn test_unreachable_api_is_recorded_in_history() {
    let (_temp_dir, config_path, db_path) = setup_test_env();
    let account_id = seed_account(&db_path, 2).await;
    let account_arg = account_id.to_string();

    let output = tele_post(&config_path)
        .args(["send", "--team", "2", "--type", "text", "--caption", "-"])
        .args(["--account", &account_arg])
        .write_stdin("Release notes\n")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["status"], "error");
    assert_eq!(json["type"], "text");

    let output = tele_post(&config_path)
        .args(["history", "--team", "2", "--account", &account_arg])
        .output()
        .unwrap();

    assert!(output.status.success());
    let records = stdout_json(&output)["result"].clone();
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["success"], false);
    assert_eq!(records[0]["post_type"], "text");
}

#[tokio::test]
async fn test_history_is_team_scoped() {
    let (_temp_dir, config_path, db_path) = setup_test_env();
    let account_id = seed_account(&db_path, 2).await;

    let output = tele_post(&config_path)
        .args(["history", "--team", "3", "--account", &account_id.to_string()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
}
