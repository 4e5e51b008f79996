//! Integration tests for commands that need no model service

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn secdocs_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("secdocs").unwrap();
    cmd.env("SECDOCS_CONFIG", config_dir.path().join("absent.yml"))
        .env("SECDOCS_DB", config_dir.path().join("index.sqlite"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    secdocs_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("sources"))
        .stdout(predicate::str::contains("build"));
}

#[test]
fn test_sources_lists_builtin_catalog() {
    let dir = TempDir::new().unwrap();
    secdocs_cmd(&dir)
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("GDPR"))
        .stdout(predicate::str::contains("CWE"))
        .stdout(predicate::str::contains("Threat Intelligence"));
}

#[test]
fn test_sources_json_is_array() {
    let dir = TempDir::new().unwrap();
    let output = secdocs_cmd(&dir)
        .args(["sources", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let sources = value.as_array().unwrap();
    assert!(sources.iter().any(|s| s["name"] == "CWE"));
}

#[test]
fn test_sources_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.yml");
    fs::write(
        &config,
        r#"knowledge_bases:
  - name: OWASP
    description: OWASP Top 10 web application risks
    category: frameworks
    collection: owasp_top10
    file: owasp.jsonl
    chunking:
      mode: granular
      chunk_size: 4096
"#,
    )
    .unwrap();

    secdocs_cmd(&dir)
        .arg("--config")
        .arg(&config)
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("OWASP"))
        .stdout(predicate::str::contains("GDPR").not());
}

#[test]
fn test_invalid_config_exits_with_invalid_input() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.yml");
    fs::write(&config, "retrieval:\n  rerank_top_n: 0\n").unwrap();

    secdocs_cmd(&dir)
        .arg("--config")
        .arg(&config)
        .arg("sources")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("rerank_top_n"));
}

#[test]
fn test_reset_unknown_source_is_not_found() {
    let dir = TempDir::new().unwrap();
    secdocs_cmd(&dir)
        .args(["reset", "NOPE"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("NOPE"));
}

#[test]
fn test_status_on_fresh_database() {
    let dir = TempDir::new().unwrap();
    secdocs_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No collections indexed"));
}

#[test]
fn test_ask_requires_query() {
    let dir = TempDir::new().unwrap();
    secdocs_cmd(&dir).arg("ask").assert().failure();
}
