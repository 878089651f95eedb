//! Smoke tests for the `todo-sync` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn todo_sync(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("todo-sync").unwrap();
    cmd.arg("--data-dir").arg(data_dir).env_remove("RUST_LOG");
    cmd
}

fn initialized() -> TempDir {
    let dir = TempDir::new().unwrap();
    todo_sync(dir.path())
        .args(["init", "--name", "Ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile initialized"));
    dir
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    todo_sync(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("host").and(predicate::str::contains("join")));
}

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();
    todo_sync(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not initialized"));
}

#[test]
fn init_twice_fails() {
    let dir = initialized();
    todo_sync(dir.path())
        .args(["init", "--name", "Again"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Already initialized"));
}

#[test]
fn add_list_done() {
    let dir = initialized();
    todo_sync(dir.path())
        .args(["category", "add", "Home", "--color", "#ff8800"])
        .assert()
        .success();
    todo_sync(dir.path())
        .args(["add", "Water plants", "--category", "home", "--deadline", "2030-01-15"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Added task "));

    todo_sync(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[ ] Water plants (Home) due 2030-01-15"),
        );

    let json = std::fs::read_to_string(dir.path().join("user.json")).unwrap();
    let user: serde_json::Value = serde_json::from_str(&json).unwrap();
    let id = user["tasks"][0]["id"].as_str().unwrap()[..8].to_string();

    todo_sync(dir.path())
        .args(["done", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("[x] Water plants"));
}

#[test]
fn add_rejects_invalid_color() {
    let dir = initialized();
    todo_sync(dir.path())
        .args(["add", "Paint", "--color", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid color"));
}

#[test]
fn share_and_accept_between_profiles() {
    let alice = initialized();
    let bob = TempDir::new().unwrap();
    todo_sync(bob.path())
        .args(["init", "--name", "Bob"])
        .assert()
        .success();

    todo_sync(alice.path())
        .args(["add", "Book tickets"])
        .assert()
        .success();
    let json = std::fs::read_to_string(alice.path().join("user.json")).unwrap();
    let user: serde_json::Value = serde_json::from_str(&json).unwrap();
    let id = user["tasks"][0]["id"].as_str().unwrap().to_string();

    let output = todo_sync(alice.path())
        .args(["share", &id])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let link = String::from_utf8(output).unwrap().trim().to_string();
    assert!(link.contains("task=") && link.contains("userName=Ana"));

    todo_sync(bob.path())
        .args(["accept", &link])
        .assert()
        .success()
        .stdout(predicate::str::contains("shared by Ana"));
    todo_sync(bob.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Book tickets from Ana"));
}

#[test]
fn export_writes_json() {
    let dir = initialized();
    todo_sync(dir.path()).args(["add", "Exported"]).assert().success();
    todo_sync(dir.path())
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Exported\""));
}

#[test]
fn status_reports_profile() {
    let dir = initialized();
    todo_sync(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Name:    Ana")
                .and(predicate::str::contains("Last sync: never"))
                .and(predicate::str::contains("Option:    no_sync")),
        );
}

#[test]
fn join_rejects_blank_id() {
    let dir = initialized();
    todo_sync(dir.path())
        .args(["join", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid sync ID"));
}
