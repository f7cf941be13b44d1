//! CLI binary integration tests using assert_cmd + predicates.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("llm-evaluator").expect("binary should exist")
}

fn rating_config(template: &str) -> String {
    serde_json::json!({
        "prompt-template": template,
        "score-config": {
            "type": "continuous",
            "key": "rating",
            "description": "The rating of the response, from 0 to 1."
        }
    })
    .to_string()
}

// ── Schema ──────────────────────────────────────────────────────────────────

#[test]
fn test_schema_to_stdout() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, rating_config("Rate it.\n{input}")).unwrap();

    let output = cmd()
        .args(["schema", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["title"], "rating");
    assert_eq!(schema["properties"]["score"]["minimum"], 0);
    assert_eq!(schema["properties"]["score"]["maximum"], 1);
    assert_eq!(schema["required"], serde_json::json!(["score"]));
}

#[test]
fn test_schema_to_file_compact() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    let out = dir.path().join("schema.json");
    fs::write(&config, rating_config("{input}")).unwrap();

    cmd()
        .args(["schema", config.to_str().unwrap()])
        .args(["-o", out.to_str().unwrap()])
        .args(["--format", "compact"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = fs::read_to_string(&out).expect("output file should exist");
    assert_eq!(content.lines().count(), 1, "compact output is one line");
    let _: serde_json::Value = serde_json::from_str(&content).expect("valid JSON");
}

// ── Check ───────────────────────────────────────────────────────────────────

#[test]
fn test_check_lists_variables() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, rating_config("{output} then {input}")).unwrap();

    let output = cmd()
        .args(["check", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["input-variables"], serde_json::json!(["output", "input"]));
    assert_eq!(summary["model"]["provider"], "openai");
    assert_eq!(summary["model"]["name"], "gpt-4o");
}

#[test]
fn test_check_unknown_variable_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, rating_config("{input} {hello}")).unwrap();

    cmd()
        .args(["check", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration_error"))
        .stderr(predicate::str::contains("'hello'"));
}

#[test]
fn test_check_with_var_succeeds() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, rating_config("{input} {hello}")).unwrap();

    cmd()
        .args(["check", config.to_str().unwrap()])
        .args(["--var", "hello=world"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"hello\""));
}

#[test]
fn test_malformed_var_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, rating_config("{input}")).unwrap();

    cmd()
        .args(["check", config.to_str().unwrap()])
        .args(["--var", "no-equals-sign"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn test_missing_config_file() {
    cmd()
        .args(["schema", "/nonexistent/config.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open evaluator config file"));
}

#[test]
fn test_invalid_json_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, "{ not json").unwrap();

    cmd()
        .args(["schema", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse evaluator config"));
}

#[test]
fn test_malformed_template_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, rating_config("Rate {input")).unwrap();

    cmd()
        .args(["schema", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed prompt template"));
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema"))
        .stdout(predicate::str::contains("render"));
}
