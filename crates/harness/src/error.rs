//! Harness error types
//!
//! [`HarnessError`] covers everything that can go wrong *around* a
//! validation: a missing tool, a broken scenario table, a timeout. A module
//! that fails validation is not an error; it becomes a failed
//! [`Outcome`](crate::outcome::Outcome).
//!
//! `From<HarnessError> for NodecheckError` lets the CLI propagate with `?`.
//!
//! # Categories
//!
//! - **Suite-fatal**: `Environment`, `SuiteDefinition`, `Aborted`
//! - **Scenario-local**: `Timeout`
//! - **Plumbing**: `Io`, `Config`

use std::time::Duration;

use nodecheck_core::error::{ConfigError, NodecheckError, SuiteError};

/// Harness domain error.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The validation tool could not be invoked or initialised.
    #[error("environment error: {reason}{}", format_diagnostics(.diagnostics))]
    Environment {
        /// Short description of what failed
        reason: String,
        /// Raw tool output, verbatim
        diagnostics: Option<String>,
    },

    /// The scenario matrix is malformed.
    #[error("suite definition error: {0}")]
    SuiteDefinition(String),

    /// A command or scenario ran past its time limit.
    #[error("{what} timed out after {}s", .after.as_secs())]
    Timeout {
        /// What was being waited on
        what: String,
        /// Configured limit
        after: Duration,
    },

    /// A scenario task was cancelled or panicked.
    #[error("scenario task aborted: {0}")]
    Aborted(String),

    /// Filesystem error while preparing a scratch directory.
    #[error("io error: {path}: {source}")]
    Io {
        /// Path involved
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Invalid runner option.
    #[error("config error: {field}: {reason}")]
    Config {
        /// Option name
        field: String,
        /// Why it was rejected
        reason: String,
    },
}

impl HarnessError {
    /// Builds an environment error without tool output.
    pub fn environment(reason: impl Into<String>) -> Self {
        Self::Environment {
            reason: reason.into(),
            diagnostics: None,
        }
    }

    /// Whether this error must abort the whole suite.
    ///
    /// Timeouts are reported on the scenario that hit them instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Timeout { .. })
    }
}

fn format_diagnostics(diagnostics: &Option<String>) -> String {
    match diagnostics {
        Some(text) if !text.trim().is_empty() => format!("\n{}", text.trim_end()),
        _ => String::new(),
    }
}

impl From<HarnessError> for NodecheckError {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Environment { .. } => {
                NodecheckError::Suite(SuiteError::Environment(err.to_string()))
            }
            HarnessError::SuiteDefinition(msg) => {
                NodecheckError::Suite(SuiteError::Definition(msg))
            }
            HarnessError::Timeout { .. } | HarnessError::Aborted(_) => {
                NodecheckError::Suite(SuiteError::Aborted(err.to_string()))
            }
            HarnessError::Io { source, .. } => NodecheckError::Io(source),
            HarnessError::Config { field, reason } => {
                NodecheckError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_error_display_includes_diagnostics() {
        let err = HarnessError::Environment {
            reason: "terraform init failed".to_owned(),
            diagnostics: Some("Error: Failed to query available provider packages\n".to_owned()),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("environment error: terraform init failed"));
        assert!(msg.contains("Failed to query available provider packages"));
    }

    #[test]
    fn environment_error_without_diagnostics_is_single_line() {
        let err = HarnessError::environment("terraform not found");
        assert_eq!(err.to_string(), "environment error: terraform not found");
    }

    #[test]
    fn timeout_display() {
        let err = HarnessError::Timeout {
            what: "scenario 'BootstrapNode'".to_owned(),
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "scenario 'BootstrapNode' timed out after 30s");
    }

    #[test]
    fn only_timeout_is_scenario_local() {
        assert!(HarnessError::environment("x").is_fatal());
        assert!(HarnessError::SuiteDefinition("x".to_owned()).is_fatal());
        assert!(HarnessError::Aborted("x".to_owned()).is_fatal());
        assert!(
            !HarnessError::Timeout {
                what: "x".to_owned(),
                after: Duration::from_secs(1),
            }
            .is_fatal()
        );
    }

    #[test]
    fn converts_environment_to_suite_error() {
        let err: NodecheckError = HarnessError::environment("missing binary").into();
        assert!(matches!(
            err,
            NodecheckError::Suite(SuiteError::Environment(_))
        ));
    }

    #[test]
    fn converts_definition_to_suite_error() {
        let err: NodecheckError = HarnessError::SuiteDefinition("empty matrix".to_owned()).into();
        assert!(matches!(err, NodecheckError::Suite(SuiteError::Definition(_))));
    }

    #[test]
    fn converts_config_to_config_error() {
        let err: NodecheckError = HarnessError::Config {
            field: "max_parallel".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            NodecheckError::Config(ConfigError::InvalidValue { .. })
        ));
    }
}
