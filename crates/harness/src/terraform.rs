//! Terraform-backed [`Validator`].
//!
//! Runs `terraform init` followed by `terraform validate -json` inside the
//! target's working directory, with `TF_DATA_DIR` pointed at the target's
//! private data directory.
//!
//! # Classification
//!
//! - spawn failure (binary missing, not executable) → `Environment`
//! - `init` failure matching a transient pattern → retried, then `Environment`
//! - other `init` failure → `validate -json` decides: errors pointing into a
//!   source file yield `Verdict::Invalid`, anything else is `Environment`
//!   carrying the `init` output
//! - `validate -json` report → `Valid` / `Invalid`; unreadable report →
//!   `Environment`
//! - command past `command_timeout` → retried, then `Timeout`
//! - `version` past the preflight timeout → `Environment`

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use nodecheck_core::metrics as m;

use crate::error::HarnessError;
use crate::target::ValidationTarget;
use crate::validator::{ToolInfo, Validator, Verdict};

/// Captured result of one tool command.
#[derive(Debug, Clone)]
struct CommandOutput {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    /// stdout and stderr joined, for pattern matching and error reports.
    fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_owned(),
            (true, _) => self.stderr.trim_end().to_owned(),
        }
    }
}

/// `terraform validate -json` report.
#[derive(Debug, Deserialize)]
struct ValidateReport {
    valid: bool,
    #[serde(default)]
    error_count: usize,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Deserialize)]
struct Diagnostic {
    severity: String,
    summary: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    range: Option<DiagnosticRange>,
}

#[derive(Debug, Deserialize)]
struct DiagnosticRange {
    filename: String,
    start: DiagnosticPos,
}

#[derive(Debug, Deserialize)]
struct DiagnosticPos {
    line: u64,
}

impl ValidateReport {
    fn verdict(&self) -> Verdict {
        if self.valid && self.error_count == 0 {
            return Verdict::Valid;
        }
        Verdict::Invalid {
            diagnostics: render_diagnostics(&self.diagnostics),
        }
    }

    /// Whether some error points at a location in the module's sources.
    ///
    /// Errors without a range ("Missing required provider") come from a
    /// missing `init`, not from the configuration itself.
    fn has_located_error(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == "error" && d.range.is_some())
    }
}

/// Limit for `terraform version` when none is configured.
const DEFAULT_PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(300);

/// `terraform version -json` output.
#[derive(Debug, Deserialize)]
struct VersionReport {
    terraform_version: String,
}

/// Production validator shelling out to the `terraform` binary.
#[derive(Debug, Clone)]
pub struct TerraformValidator {
    binary: PathBuf,
    preflight_timeout: Duration,
}

impl TerraformValidator {
    /// Validator using `binary` (a name looked up on `PATH`, or a path).
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            preflight_timeout: DEFAULT_PREFLIGHT_TIMEOUT,
        }
    }

    /// Sets the limit for the `terraform version` preflight.
    pub fn with_preflight_timeout(mut self, timeout: Duration) -> Self {
        self.preflight_timeout = timeout;
        self
    }

    /// Binary this validator invokes.
    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    fn spawn_error(&self, e: std::io::Error) -> HarnessError {
        let reason = match e.kind() {
            std::io::ErrorKind::NotFound => {
                format!("terraform binary '{}' not found", self.binary.display())
            }
            std::io::ErrorKind::PermissionDenied => format!(
                "terraform binary '{}' is not executable",
                self.binary.display()
            ),
            _ => format!("failed to run '{}': {e}", self.binary.display()),
        };
        HarnessError::environment(reason)
    }

    fn command(&self, target: &ValidationTarget, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(target.working_dir())
            .env("TF_DATA_DIR", target.data_dir())
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Runs one command once, bounded by the target's command timeout.
    async fn run_once(
        &self,
        target: &ValidationTarget,
        subcommand: &'static str,
        args: &[&str],
    ) -> Result<CommandOutput, HarnessError> {
        metrics::counter!(m::TOOL_INVOCATIONS_TOTAL, m::LABEL_COMMAND => subcommand).increment(1);

        let timeout = target.options().command_timeout;
        let output = tokio::time::timeout(timeout, self.command(target, args).output())
            .await
            .map_err(|_elapsed| HarnessError::Timeout {
                what: format!("terraform {subcommand} for '{}'", target.scenario()),
                after: timeout,
            })?
            .map_err(|e| self.spawn_error(e))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Runs a command, retrying transient failures and timeouts per the
    /// target's retry policy.
    ///
    /// A non-transient failure is returned as `Ok` with `success == false`
    /// so the caller can decide what it means.
    async fn run_with_retry(
        &self,
        target: &ValidationTarget,
        subcommand: &'static str,
        args: &[&str],
    ) -> Result<CommandOutput, HarnessError> {
        let policy = &target.options().retry;
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let backoff = policy.delay_for(attempt);
                metrics::counter!(m::TOOL_RETRIES_TOTAL, m::LABEL_COMMAND => subcommand)
                    .increment(1);
                warn!(
                    scenario = target.scenario(),
                    command = subcommand,
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "retrying terraform command"
                );
                tokio::time::sleep(backoff).await;
            }
            let can_retry = attempt < policy.max_retries();
            attempt += 1;

            let output = match self.run_once(target, subcommand, args).await {
                Ok(output) => output,
                Err(HarnessError::Timeout { .. }) if can_retry => continue,
                Err(e) => return Err(e),
            };

            if output.success {
                return Ok(output);
            }

            let combined = output.combined();
            match policy.classify(&combined) {
                Some(description) if can_retry => {
                    debug!(
                        scenario = target.scenario(),
                        command = subcommand,
                        reason = description,
                        "transient terraform error"
                    );
                }
                Some(description) => {
                    return Err(HarnessError::Environment {
                        reason: format!(
                            "terraform {subcommand} failed after {attempt} attempt(s): {description}"
                        ),
                        diagnostics: Some(combined),
                    });
                }
                None => return Ok(output),
            }
        }
    }

    async fn init(&self, target: &ValidationTarget) -> Result<CommandOutput, HarnessError> {
        let mut args = vec!["init", "-input=false"];
        if !target.options().backend {
            args.push("-backend=false");
        }
        if target.options().no_color {
            args.push("-no-color");
        }
        self.run_with_retry(target, "init", &args).await
    }

    /// Runs `validate -json`. Returns `None` when no report could be read.
    async fn validate_json(
        &self,
        target: &ValidationTarget,
    ) -> Result<(Option<ValidateReport>, CommandOutput), HarnessError> {
        let mut args = vec!["validate", "-json"];
        if target.options().no_color {
            args.push("-no-color");
        }
        let output = self.run_with_retry(target, "validate", &args).await?;
        let report = parse_validate_report(&output.stdout);
        Ok((report, output))
    }
}

impl Validator for TerraformValidator {
    async fn preflight(&self) -> Result<ToolInfo, HarnessError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["version", "-json"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.preflight_timeout, cmd.output())
            .await
            .map_err(|_elapsed| {
                HarnessError::environment(format!(
                    "'{} version' did not finish within {:?}",
                    self.binary.display(),
                    self.preflight_timeout
                ))
            })?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(HarnessError::Environment {
                reason: format!(
                    "'{} version' exited with {}",
                    self.binary.display(),
                    output.status
                ),
                diagnostics: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = serde_json::from_str::<VersionReport>(&stdout)
            .map(|r| r.terraform_version)
            .unwrap_or_else(|_| {
                // pre-0.13 releases have no -json flag and print plain text
                stdout.lines().next().unwrap_or_default().trim().to_owned()
            });

        info!(binary = %self.binary.display(), version = %version, "terraform available");
        Ok(ToolInfo {
            name: "terraform".to_owned(),
            version,
        })
    }

    async fn validate(&self, target: &ValidationTarget) -> Result<Verdict, HarnessError> {
        let init = self.init(target).await?;

        if !init.success {
            // init also parses the configuration; a malformed module fails
            // here first, and validate reports the same problem with a
            // source location
            let (report, _) = self.validate_json(target).await?;
            return match report {
                Some(report) if report.has_located_error() => Ok(report.verdict()),
                _ => Err(HarnessError::Environment {
                    reason: format!(
                        "terraform init failed (exit code {})",
                        display_code(init.code)
                    ),
                    diagnostics: Some(init.combined()),
                }),
            };
        }

        let (report, output) = self.validate_json(target).await?;
        report.map(|r| r.verdict()).ok_or_else(|| HarnessError::Environment {
            reason: format!(
                "terraform validate produced no report (exit code {})",
                display_code(output.code)
            ),
            diagnostics: Some(output.combined()),
        })
    }
}

fn display_code(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_owned(), |c| c.to_string())
}

/// Parses `terraform validate -json` stdout.
fn parse_validate_report(stdout: &str) -> Option<ValidateReport> {
    serde_json::from_str(stdout.trim()).ok()
}

/// Renders diagnostics in terraform's human layout, errors only.
fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diag in diagnostics.iter().filter(|d| d.severity == "error") {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "Error: {}", diag.summary);
        if let Some(range) = &diag.range {
            let _ = writeln!(out, "\n  on {} line {}:", range.filename, range.start.line);
        }
        if !diag.detail.is_empty() {
            let _ = writeln!(out, "\n{}", diag.detail);
        }
    }
    if out.is_empty() {
        out.push_str("configuration is invalid (no error diagnostics reported)");
    }
    out.trim_end().to_owned()
}
