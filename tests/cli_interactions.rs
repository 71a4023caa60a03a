//! CLI startup and subcommand tests
//!
//! These run the compiled `glh` binary and check argument validation, exit
//! codes and a full create-then-client cycle against an in-process server.

use assert_cmd::prelude::*;
use group_latency_harness::{logging::Logger, models::RunGroup, output::ReportWriter, server::serve_listener};
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Helper function to create a test command with a clean environment
fn glh(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("glh").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("GLH_REMOTE")
        .env_remove("GLH_REQUEST_TIMEOUT_SECS")
        .env_remove("LOG_LEVEL")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    glh(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("server"))
        .stdout(predicate::str::contains("client"))
        .stdout(predicate::str::contains("create"));
}

#[test]
fn test_client_without_group_fails() {
    let dir = TempDir::new().unwrap();
    glh(&dir)
        .arg("client")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no run group ID"));
}

#[test]
fn test_client_without_remote_fails() {
    let dir = TempDir::new().unwrap();
    glh(&dir)
        .args(["client", "-g", "g1", "-f", "report.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no remote server"));
}

#[test]
fn test_client_without_report_fails() {
    let dir = TempDir::new().unwrap();
    glh(&dir)
        .args(["client", "-g", "g1", "-r", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no report file"));
}

#[test]
fn test_remote_from_env_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "GLH_REMOTE=ftp://example.com\n").unwrap();

    glh(&dir)
        .args(["client", "-g", "g1", "-f", "report.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must use http or https"));
}

#[test]
fn test_invalid_timeout_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    glh(&dir)
        .args(["client", "-g", "g1", "-r", "http://localhost", "-f", "r.json", "-t", "+5"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_upstream_timeout_requires_upstream() {
    let dir = TempDir::new().unwrap();
    glh(&dir)
        .args(["create", "-r", "http://localhost", "-n", "1", "--upstream-timeout-ms", "10"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_unreachable_server_is_network_error() {
    let dir = TempDir::new().unwrap();
    glh(&dir)
        .args(["groups", "-r", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .code(2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_create_then_client_writes_report() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let cancel = CancellationToken::new();
    tokio::spawn(serve_listener(listener, Logger::new("SERVER"), cancel.clone()));

    let dir = TempDir::new().unwrap();
    let create_base = base.clone();
    let create_dir = dir.path().to_path_buf();
    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("glh")
            .unwrap()
            .current_dir(create_dir)
            .args(["create", "-r", &create_base, "-n", "3", "-c", "2", "--description", "cli"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let group: RunGroup = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(group.run_count(), 3);
    assert_eq!(group.description, "cli");

    let report_path = dir.path().join("out").join("report.json");
    let client_report = report_path.clone();
    let client_dir = dir.path().to_path_buf();
    let group_id = group.id().to_string();
    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("glh")
            .unwrap()
            .current_dir(client_dir)
            .env("NO_COLOR", "1")
            .args(["client", "-g", &group_id, "-r", &base, "-d", "x"])
            .arg("-f")
            .arg(&client_report)
            .output()
            .unwrap()
    })
    .await
    .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("3 total, 3 matched, 0 unmatched"));

    let report = ReportWriter::read(&report_path).unwrap();
    assert_eq!(report.results.len(), 3);
    assert!(report.results.iter().all(|r| r.is_clean()));

    cancel.cancel();
}
