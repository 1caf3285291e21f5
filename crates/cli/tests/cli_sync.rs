// Integration tests for the `sheetsync` binary.
// Run with: cargo test -p sheetsync-cli --test cli_sync

use std::process::{Command, Output};

use httpmock::prelude::*;

fn sheetsync() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sheetsync"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    // Clear env to avoid leaking a real token or endpoint into tests
    cmd.env_remove("SMARTSHEET_ACCESS_TOKEN");
    cmd.env_remove("SMARTSHEET_API_BASE");
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit {code}, got {:?}\nstdout: {}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
}

// ── validate ────────────────────────────────────────────────────────

#[test]
fn validate_ok_exits_0() {
    let output = sheetsync()
        .args(["validate", "tests/fixtures/changelog.sync.toml"])
        .output()
        .expect("failed to run sheetsync");

    assert_exit(&output, 0);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OK (1 source(s), 1 target(s))"), "stderr: {stderr}");
    assert!(stderr.contains("target 'Change log' (300) [update] <- 100"), "stderr: {stderr}");
}

#[test]
fn validate_bad_window_exits_3() {
    let output = sheetsync()
        .args(["validate", "tests/fixtures/bad_window.sync.toml"])
        .output()
        .expect("failed to run sheetsync");

    assert_exit(&output, 3);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("start 2025-12-01 is after end 2025-10-01"), "stderr: {stderr}");
}

#[test]
fn validate_unknown_key_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typo.sync.toml");
    std::fs::write(
        &path,
        "[[sources]]\nid = 1\n\n[[targets]]\nid = 2\nmode = \"update\"\ntracking_colum = \"X\"\n",
    )
    .unwrap();

    let output = sheetsync()
        .arg("validate")
        .arg(&path)
        .output()
        .expect("failed to run sheetsync");
    assert_exit(&output, 3);
}

#[test]
fn missing_config_file_exits_2() {
    let output = sheetsync()
        .args(["validate", "tests/fixtures/does-not-exist.toml"])
        .output()
        .expect("failed to run sheetsync");
    assert_exit(&output, 2);
}

// ── run ─────────────────────────────────────────────────────────────

#[test]
fn missing_token_exits_4_before_any_request() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.path_includes("/");
        then.status(500);
    });

    let output = sheetsync()
        .args(["run", "tests/fixtures/changelog.sync.toml", "--api-base"])
        .arg(server.url("/2.0"))
        .output()
        .expect("failed to run sheetsync");

    assert_exit(&output, 4);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing Smartsheet access token"), "stderr: {stderr}");
    assert!(stderr.contains("SMARTSHEET_ACCESS_TOKEN"), "stderr: {stderr}");
    any.assert_calls(0);
}

#[test]
fn unreadable_source_exits_5() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/2.0/sheets/100");
        then.status(403)
            .json_body(serde_json::json!({"errorCode": 1004, "message": "Not authorized"}));
    });
    let target = server.mock(|when, then| {
        when.path_includes("/2.0/sheets/300");
        then.status(200);
    });

    let output = sheetsync()
        .args(["run", "tests/fixtures/changelog.sync.toml", "--token", "test_token", "--api-base"])
        .arg(server.url("/2.0"))
        .output()
        .expect("failed to run sheetsync");

    assert_exit(&output, 5);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot load source table 100"), "stderr: {stderr}");
    target.assert_calls(0);
}

fn mock_sheets(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/2.0/sheets/100")
            .header("authorization", "Bearer test_token")
            .query_param("columnIds", "11,12");
        then.status(200).json_body(serde_json::json!({
            "id": 100,
            "name": "Master",
            "columns": [
                {"id": 11, "title": "Work Request #"},
                {"id": 12, "title": "Status"}
            ],
            "rows": [
                {"id": 1, "cells": [
                    {"columnId": 11, "value": "WR-1"},
                    {"columnId": 12, "value": "Open"}
                ]},
                {"id": 2, "cells": [
                    {"columnId": 11},
                    {"columnId": 12, "value": "Draft"}
                ]},
                {"id": 3, "cells": [
                    {"columnId": 11, "value": "WR-3"},
                    {"columnId": 12, "value": "Open"}
                ]}
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/2.0/sheets/300");
        then.status(200).json_body(serde_json::json!({
            "id": 300,
            "name": "Change log",
            "columns": [
                {"id": 31, "title": "Source_Row_ID"},
                {"id": 32, "title": "Work Request #"},
                {"id": 33, "title": "Status"}
            ],
            "rows": [
                {"id": 900, "cells": [
                    {"columnId": 31, "value": "100_1"},
                    {"columnId": 32, "value": "WR-1"},
                    {"columnId": 33, "value": "New"}
                ]}
            ]
        }));
    });
}

#[test]
fn run_writes_updates_and_creates() {
    let server = MockServer::start();
    mock_sheets(&server);
    let update = server.mock(|when, then| {
        when.method(PUT)
            .path("/2.0/sheets/300/rows")
            .json_body(serde_json::json!([
                {"id": 900, "cells": [{"columnId": 33, "value": "Open", "strict": false}]}
            ]));
        then.status(200).json_body(serde_json::json!({"message": "SUCCESS", "resultCode": 0}));
    });
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/2.0/sheets/300/rows")
            .json_body(serde_json::json!([
                {"toBottom": true, "cells": [
                    {"columnId": 32, "value": "WR-3", "strict": false},
                    {"columnId": 33, "value": "Open", "strict": false},
                    {"columnId": 31, "value": "100_3", "strict": false}
                ]}
            ]));
        then.status(200).json_body(serde_json::json!({"message": "SUCCESS", "resultCode": 0}));
    });

    let output = sheetsync()
        .args(["run", "tests/fixtures/changelog.sync.toml", "--today", "2025-07-01", "--json"])
        .args(["--token", "test_token", "--api-base"])
        .arg(server.url("/2.0"))
        .output()
        .expect("failed to run sheetsync");

    assert_exit(&output, 0);
    update.assert();
    create.assert();

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["current_period"], "2025-07-06");
    let target = &report["targets"][0];
    assert_eq!(target["status"], "synced");
    assert_eq!(target["source_records"], 2);
    assert_eq!(target["created"], 1);
    assert_eq!(target["updated"], 1);
}

#[test]
fn failed_write_exits_6_and_reports_target() {
    let server = MockServer::start();
    mock_sheets(&server);
    server.mock(|when, then| {
        when.method(PUT).path("/2.0/sheets/300/rows");
        then.status(500).json_body(serde_json::json!({"errorCode": 4000, "message": "Internal error"}));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/2.0/sheets/300/rows");
        then.status(200);
    });

    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.json");
    let output = sheetsync()
        .args(["run", "tests/fixtures/changelog.sync.toml", "--today", "2025-07-01"])
        .args(["--token", "test_token", "--api-base"])
        .arg(server.url("/2.0"))
        .arg("--output")
        .arg(&report_path)
        .output()
        .expect("failed to run sheetsync");

    assert_exit(&output, 6);
    // Creates come after the failed update chunk and are never sent.
    create.assert_calls(0);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    let target = &report["targets"][0];
    assert_eq!(target["status"], "failed");
    assert!(target["error"].as_str().unwrap().contains("Internal error"));
    assert_eq!(target["write"]["chunks_not_attempted"], 1);
}

#[test]
fn dry_run_sends_no_writes() {
    let server = MockServer::start();
    mock_sheets(&server);
    let writes = server.mock(|when, then| {
        when.path("/2.0/sheets/300/rows");
        then.status(200);
    });

    let output = sheetsync()
        .args(["run", "tests/fixtures/changelog.sync.toml", "--today", "2025-07-01"])
        .args(["--dry-run", "--json", "--token", "test_token", "--api-base"])
        .arg(server.url("/2.0"))
        .output()
        .expect("failed to run sheetsync");

    assert_exit(&output, 0);
    writes.assert_calls(0);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["targets"][0]["status"], "planned");
    assert_eq!(report["targets"][0]["plan"]["creates"].as_array().unwrap().len(), 1);
}

// ── periods ─────────────────────────────────────────────────────────

#[test]
fn periods_lists_sundays_with_indices() {
    let output = sheetsync()
        .args(["periods", "--epoch", "2025-06-15", "--from", "2025-06-16", "--to", "2025-07-06"])
        .output()
        .expect("failed to run sheetsync");

    assert_exit(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["2025-06-22\t1", "2025-06-29\t2", "2025-07-06\t3"]);
}

#[test]
fn periods_json_and_reversed_range() {
    let output = sheetsync()
        .args(["periods", "--epoch", "2025-06-15", "--to", "2025-06-22", "--json"])
        .output()
        .expect("failed to run sheetsync");
    assert_exit(&output, 0);
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows, serde_json::json!([
        {"period_end": "2025-06-15", "index": 0},
        {"period_end": "2025-06-22", "index": 1}
    ]));

    let output = sheetsync()
        .args(["periods", "--epoch", "2025-06-15", "--from", "2025-07-01", "--to", "2025-06-01"])
        .output()
        .expect("failed to run sheetsync");
    assert_exit(&output, 2);
}
