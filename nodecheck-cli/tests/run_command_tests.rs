//! End-to-end tests for `nodecheck run` / `nodecheck list`.
//!
//! Runs the built binary against a stub `terraform` script and checks the
//! exit code contract: 0 pass, 1 scenario failure, 2 definition error,
//! 3 environment error.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serial_test::serial;
use tempfile::TempDir;

const VALID_REPORT: &str = r#"{"format_version":"1.0","valid":true,"error_count":0,"warning_count":0,"diagnostics":[]}"#;

const INVALID_REPORT: &str = r#"{"format_version":"1.0","valid":false,"error_count":1,"warning_count":0,"diagnostics":[{"severity":"error","summary":"Unsupported block type","detail":"Blocks of type resourse are not expected here.","range":{"filename":"main.tf","start":{"line":7,"column":1,"byte":120},"end":{"line":7,"column":8,"byte":127}}}]}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("should create temp dir");
        let module = dir.path().join("module");
        std::fs::create_dir(&module).expect("should create module dir");
        std::fs::write(module.join("main.tf"), "variable \"role\" {}\n")
            .expect("should write module");
        Self { dir }
    }

    fn module(&self) -> PathBuf {
        self.dir.path().join("module")
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("nodecheck.toml")
    }

    /// Writes a stub terraform answering `version`, `init` and `validate`.
    fn terraform(&self, init: &str, validate: &str) -> PathBuf {
        let path = self.dir.path().join("terraform");
        let script = format!(
            r#"#!/bin/sh
case "$1" in
  version) echo '{{"terraform_version":"1.9.5"}}' ;;
  init) {init} ;;
  validate) {validate} ;;
esac
"#
        );
        write_executable(&path, &script);
        path
    }

    fn nodecheck(&self, terraform: &Path, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_nodecheck"))
            .arg("--config")
            .arg(self.config())
            .args(["--log-level", "error", "--output", "json"])
            .args(args)
            .arg("--module-dir")
            .arg(self.module())
            .arg("--terraform-bin")
            .arg(terraform)
            .env_remove("RUST_LOG")
            .output()
            .expect("should run nodecheck binary")
    }
}

fn write_executable(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("should write script");
    let mut perms = std::fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("should chmod script");
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
#[serial]
fn test_run_valid_module_exits_zero() {
    // Given: a module terraform accepts
    let ws = Workspace::new();
    let terraform = ws.terraform("echo initialized", &format!("echo '{VALID_REPORT}'"));

    // When: the three matrix groups run
    let output = ws.nodecheck(
        &terraform,
        &["run", "-g", "inputs", "-g", "instance-types", "-g", "bootstrap"],
    );

    // Then: 15 passing scenarios, exit 0
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["passed"], true);
    assert_eq!(report["results"].as_array().map(Vec::len), Some(15));
}

#[test]
#[serial]
fn test_run_malformed_module_exits_one() {
    // Given: a module with an unsupported block
    let ws = Workspace::new();
    let terraform = ws.terraform(
        "echo 'Error: Unsupported block type' >&2; exit 1",
        &format!("echo '{INVALID_REPORT}'; exit 1"),
    );

    // When
    let output = ws.nodecheck(&terraform, &["run", "--group", "bootstrap"]);

    // Then: every scenario fails with the same diagnostic, exit 1
    assert_eq!(output.status.code(), Some(1));
    let report = stdout_json(&output);
    assert_eq!(report["passed"], false);
    let results = report["results"].as_array().expect("results array");
    assert_eq!(results.len(), 2);
    for result in results {
        assert_eq!(result["status"], "fail");
        assert!(
            result["message"]
                .as_str()
                .expect("message")
                .contains("Unsupported block type")
        );
    }
}

#[test]
#[serial]
fn test_run_missing_terraform_exits_three() {
    let ws = Workspace::new();
    let missing = ws.dir.path().join("no-such-terraform");

    let output = ws.nodecheck(&missing, &["run"]);

    assert_eq!(output.status.code(), Some(3));
    // aborted before any outcome: nothing rendered
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
#[serial]
fn test_run_duplicate_matrix_entry_exits_two() {
    let ws = Workspace::new();
    std::fs::write(
        ws.config(),
        "[matrix]\nbootstrap_roles = [\"BootstrapNode\", \"BootstrapNode\"]\n",
    )
    .expect("should write config");
    let terraform = ws.terraform("echo initialized", &format!("echo '{VALID_REPORT}'"));

    let output = ws.nodecheck(&terraform, &["run", "--group", "bootstrap"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("duplicate scenario name"));
}

#[test]
fn test_list_prints_declared_matrix() {
    let ws = Workspace::new();

    let output = Command::new(env!("CARGO_BIN_EXE_nodecheck"))
        .arg("--config")
        .arg(ws.config())
        .args(["--log-level", "error", "--output", "json", "list"])
        .env_remove("RUST_LOG")
        .output()
        .expect("should run nodecheck binary");

    assert_eq!(output.status.code(), Some(0));
    let report = stdout_json(&output);
    assert_eq!(report["total"], 16);
}
