//! CLI integration tests
//!
//! These tests run the `dae-validator` binary against documents and schemas
//! written to a temporary directory.

#![cfg(feature = "cli")]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const COLLADA_1_4_1: &str = "http://www.collada.org/2005/11/COLLADASchema";

const COLLADA_SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    targetNamespace="http://www.collada.org/2005/11/COLLADASchema">
  <xs:element name="COLLADA">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="asset" minOccurs="0"/>
        <xs:element name="geometry" minOccurs="0" maxOccurs="unbounded"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

fn validator_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dae-validator"))
}

/// Workspace with the bundled schema and the given documents
fn workspace(documents: &[(&str, String)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("collada_schema_1_4_1.xsd"), COLLADA_SCHEMA).unwrap();
    for (name, content) in documents {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn scene(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<COLLADA xmlns=\"{}\">\n{}\n</COLLADA>\n",
        COLLADA_1_4_1, body
    )
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(validator_bin())
        .arg("--schema-dir")
        .arg(dir)
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_cli_valid_document() {
    let dir = workspace(&[("ok.dae", scene("<asset/>\n<geometry id=\"g\"/>"))]);
    let output = run(dir.path(), &["ok.dae"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("ok.dae: OK"), "stdout: {}", stdout);
}

#[test]
fn test_cli_duplicate_id_json() {
    let dir = workspace(&[(
        "dup.dae",
        scene("<geometry id=\"mesh1\"/>\n<geometry id=\"mesh1\"/>"),
    )]);
    let output = run(dir.path(), &["--json", "dup.dae"]);

    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("Output should be valid JSON");
    let report = &json[0];
    assert_eq!(report["file"], "dup.dae");
    assert_eq!(report["code"], 1);
    assert_eq!(report["findings"][0]["kind"]["type"], "duplicate_id");
    assert_eq!(report["findings"][0]["kind"]["first_line"], 3);
    assert_eq!(report["findings"][0]["line"], 4);
}

#[test]
fn test_cli_duplicate_id_logged() {
    let dir = workspace(&[(
        "dup.dae",
        scene("<geometry id=\"mesh1\"/>\n<geometry id=\"mesh1\"/>"),
    )]);
    let output = run(dir.path(), &["dup.dae"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("dup.dae:4: Duplicated id \"mesh1\". See first declaration at line 3."),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_cli_content_model_violation() {
    let dir = workspace(&[("order.dae", scene("<geometry id=\"g\"/>\n<asset/>"))]);
    let output = run(dir.path(), &["--json", "order.dae"]);

    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("Output should be valid JSON");
    let finding = &json[0]["findings"][0];
    assert_eq!(finding["kind"]["type"], "schema_violation");
    assert_eq!(finding["line"], 4);
    assert_eq!(finding["path"], "/COLLADA/asset");
}

#[test]
fn test_cli_missing_bundled_schema() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ok.dae"), scene("<asset/>")).unwrap();
    let output = run(dir.path(), &["-q", "ok.dae"]);

    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_cli_advisory_only_exits_zero() {
    let dir = workspace(&[(
        "ext.dae",
        format!(
            "<COLLADA xmlns=\"{}\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:schemaLocation=\"urn:fx nowhere.xsd\"><asset/></COLLADA>",
            COLLADA_1_4_1
        ),
    )]);
    let output = run(dir.path(), &["ext.dae"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("some schemas could not be loaded"), "stdout: {}", stdout);
}

#[test]
fn test_cli_explicit_schema() {
    let dir = workspace(&[(
        "custom.xml",
        r#"<scene xmlns="urn:custom"/>"#.to_string(),
    )]);
    fs::write(
        dir.path().join("custom.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:custom">
  <xs:element name="scene"/>
</xs:schema>"#,
    )
    .unwrap();

    let output = run(dir.path(), &["--schema", "custom.xsd", "custom.xml"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_cli_exit_status_combines_files() {
    let dir = workspace(&[
        ("ok.dae", scene("<asset/>")),
        ("broken.dae", "<COLLADA><asset>".to_string()),
    ]);
    let output = run(dir.path(), &["--json", "ok.dae", "broken.dae"]);

    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("Output should be valid JSON");
    assert_eq!(json[0]["exit_status"], 0);
    assert_eq!(json[1]["exit_status"], 1);
    assert!(json[1]["error"].is_string());
}

#[test]
fn test_cli_requires_files() {
    let output = Command::new(validator_bin()).output().expect("Failed to execute command");
    assert!(!output.status.success());
}
