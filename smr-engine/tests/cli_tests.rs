//! Process boundary tests for the `smr` binary
//!
//! Each test runs the compiled binary against a canned fixture with an
//! isolated config file, feeding the request on stdin.

use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const FIXTURE: &str = r#"{
    "name": "network",
    "by_text": {
        "rare scene": [{"id": "77", "title": "Rare Scene"}]
    },
    "sub_sources": [
        {"name": "siteA", "results": {"jane example": [{"id": "p1", "title": "Janet Exemplar"}]}},
        {"name": "siteB", "results": {"jane example": [{"id": "p2", "title": "Jane Example"}]}}
    ]
}"#;

struct Workspace {
    _dir: tempfile::TempDir,
    config: PathBuf,
    fixture: PathBuf,
}

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let fixture = dir.path().join("fixture.json");
    std::fs::write(&config, "[logging]\nlevel = \"warn\"\n").unwrap();
    std::fs::write(&fixture, FIXTURE).unwrap();
    Workspace {
        _dir: dir,
        config,
        fixture,
    }
}

fn run_smr(config: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_smr"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("SMR_CONFIG")
        .env_remove("SMR_FEDERATED_MIN_RATIO")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_scene_prints_match() {
    let ws = workspace();
    let fixture = ws.fixture.to_str().unwrap();

    let output = run_smr(&ws.config, &["scene", "--fixture", fixture], r#"{"title": "Rare Scene"}"#);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["candidate"]["id"], "77");
    assert_eq!(json["tier"], "R");
}

#[test]
fn test_scene_without_match_prints_empty_object() {
    let ws = workspace();
    let fixture = ws.fixture.to_str().unwrap();

    let output = run_smr(&ws.config, &["scene", "--fixture", fixture], r#"{"title": "Unknown"}"#);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), serde_json::json!({}));
}

#[test]
fn test_scene_without_query_key_fails() {
    let ws = workspace();
    let fixture = ws.fixture.to_str().unwrap();

    let output = run_smr(&ws.config, &["scene", "--fixture", fixture], r#"{"id": "12"}"#);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_malformed_request_fails() {
    let ws = workspace();
    let fixture = ws.fixture.to_str().unwrap();

    let output = run_smr(&ws.config, &["scene", "--fixture", fixture], "not json");
    assert!(!output.status.success());
}

#[test]
fn test_find_performer_prints_hit() {
    let ws = workspace();
    let fixture = ws.fixture.to_str().unwrap();

    let output = run_smr(
        &ws.config,
        &["find", "--fixture", fixture, "--performer"],
        r#"{"name": "Jane Example"}"#,
    );

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["sub_source"], "siteB");
    assert_eq!(json["candidate"]["id"], "p2");
}

#[test]
fn test_find_below_threshold_prints_null() {
    let ws = workspace();
    let fixture = ws.fixture.to_str().unwrap();

    let output = run_smr(
        &ws.config,
        &["find", "--fixture", fixture, "--sub-source", "siteA", "--min-ratio", "0.95"],
        r#"{"name": "Jane Example"}"#,
    );

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), Value::Null);
}

#[test]
fn test_find_uses_request_extra_sub_sources() {
    let ws = workspace();
    let fixture = ws.fixture.to_str().unwrap();

    // Only siteA is searched, and its best hit is below the threshold
    let output = run_smr(
        &ws.config,
        &["find", "--fixture", fixture, "--min-ratio", "0.95"],
        r#"{"name": "Jane Example", "extra": ["siteA"]}"#,
    );
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), Value::Null);

    // An explicit flag wins over the request's list
    let output = run_smr(
        &ws.config,
        &["find", "--fixture", fixture, "--sub-source", "siteB", "--min-ratio", "0.95"],
        r#"{"name": "Jane Example", "extra": ["siteA"]}"#,
    );
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["candidate"]["id"], "p2");
}

#[test]
fn test_search_uses_request_extra_sub_sources() {
    let ws = workspace();
    let fixture = ws.fixture.to_str().unwrap();

    let output = run_smr(
        &ws.config,
        &["search", "--fixture", fixture],
        r#"{"name": "Jane Example", "extra": ["siteA"]}"#,
    );

    assert!(output.status.success());
    let json = stdout_json(&output);
    let hits = json.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["candidate"]["id"], "p1");
}

#[test]
fn test_search_prints_sorted_listing() {
    let ws = workspace();
    let fixture = ws.fixture.to_str().unwrap();

    let output = run_smr(&ws.config, &["search", "--fixture", fixture], r#"{"name": "Jane Example"}"#);

    assert!(output.status.success());
    let json = stdout_json(&output);
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["candidate"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["p2", "p1"]);
}

#[test]
fn test_init_config_refuses_to_overwrite() {
    let ws = workspace();
    let target = ws.config.with_file_name("fresh.toml");

    let first = run_smr(&target, &["init-config"], "");
    assert!(first.status.success());
    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("identity_duration_tolerance_secs = 120"));

    let second = run_smr(&target, &["init-config"], "");
    assert!(!second.status.success());

    let forced = run_smr(&target, &["init-config", "--force"], "");
    assert!(forced.status.success());
}
