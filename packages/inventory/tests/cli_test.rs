//! Command-line tests running the built binary.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn harvester() -> Command {
    let mut cmd = Command::cargo_bin("inventory-harvester").unwrap();
    cmd.env_remove("INVENTORY_SUBJECTS")
        .env_remove("INVENTORY_CHANGE_POLICY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_validate_valid_document() {
    harvester()
        .arg("validate")
        .arg(fixture("inventory.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid:"));
}

#[test]
fn test_validate_invalid_document_fails() {
    harvester()
        .arg("validate")
        .arg(fixture("invalid.xml"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not conform to schema"))
        .stderr(predicate::str::contains("unexpected element <Title>"));
}

#[test]
fn test_validate_malformed_document_fails() {
    harvester()
        .arg("validate")
        .arg(fixture("malformed.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed inventory document"));
}

#[test]
fn test_validate_missing_file_fails() {
    harvester()
        .args(["validate", "does-not-exist.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_parse_outputs_json() {
    let output = harvester()
        .arg("parse")
        .arg(fixture("inventory.xml"))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["metadata"]["identifier"], "http://example.gov/");
    assert_eq!(json["datasets"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["datasets"][0]["resources"][1]["active"], false);
    assert_eq!(json["datasets"][0]["resources"][0]["resource_type"], "data");
}

#[test]
fn test_parse_first_subject_only_from_env() {
    let output = harvester()
        .env("INVENTORY_SUBJECTS", "first")
        .arg("parse")
        .arg(fixture("inventory.xml"))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        json["datasets"][0]["services"],
        serde_json::json!(["http://id.esd.org.uk/service/1166"])
    );
}

#[test]
fn test_invalid_env_config_fails() {
    harvester()
        .env("INVENTORY_CHANGE_POLICY", "sometimes")
        .arg("parse")
        .arg(fixture("inventory.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("INVENTORY_CHANGE_POLICY"));
}

#[test]
fn test_parse_outputs_yaml_by_default() {
    harvester()
        .arg("parse")
        .arg(fixture("inventory.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("metadata:"))
        .stdout(predicate::str::contains("http://example.gov/"));
}

#[test]
fn test_reconcile_with_previous_records() {
    let output = harvester()
        .arg("reconcile")
        .arg(fixture("inventory.xml"))
        .arg("--previous")
        .arg(fixture("previous.json"))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"], "processed");

    let statuses: Vec<&str> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["decision"]["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["new", "unchanged", "changed", "duplicate"]);
    assert_eq!(json["entries"][2]["decision"]["carried_reference"], "pkg-parking");
    assert_eq!(json["errors"][0]["kind"], "duplicate_key");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 new, 1 changed, 1 unchanged, 1 duplicate, 0 invalid"));
}

#[test]
fn test_reconcile_not_modified() {
    harvester()
        .arg("reconcile")
        .arg(fixture("inventory.xml"))
        .args(["--last-run", "2013-12-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("outcome: not_modified"))
        .stderr(predicate::str::contains("Not modified"));
}

#[test]
fn test_reconcile_rejects_bad_last_run() {
    harvester()
        .arg("reconcile")
        .arg(fixture("inventory.xml"))
        .args(["--last-run", "01/12/2013"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date format"));
}

#[test]
fn test_reconcile_rejects_bad_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let previous = dir.path().join("previous.json");
    std::fs::write(&previous, "{ not json").unwrap();

    harvester()
        .arg("reconcile")
        .arg(fixture("inventory.xml"))
        .arg("--previous")
        .arg(&previous)
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON"));
}
