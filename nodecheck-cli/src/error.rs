//! CLI-specific error types and exit code mapping

use nodecheck_core::error::{NodecheckError, SuiteError};
use nodecheck_harness::HarnessError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to the process exit status.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// The scenario matrix is malformed (duplicate or empty).
    #[error("suite definition error: {0}")]
    Definition(String),

    /// The validation tool could not be invoked; the suite was aborted.
    #[error("{0}")]
    Environment(String),

    /// The suite ran to completion but at least one scenario did not pass.
    #[error("{0}")]
    ScenariosFailed(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                 |
    /// |------|-----------------------------------------|
    /// | 0    | Success, every scenario passed          |
    /// | 1    | Scenario failure / general error        |
    /// | 2    | Configuration or suite definition error |
    /// | 3    | Environment error (tool unusable)       |
    /// | 10   | IO error                                |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Definition(_) => 2,
            Self::Environment(_) => 3,
            Self::Io(_) => 10,
            Self::ScenariosFailed(_) | Self::Command(_) | Self::JsonSerialize(_) => 1,
        }
    }
}

impl From<NodecheckError> for CliError {
    fn from(e: NodecheckError) -> Self {
        match e {
            NodecheckError::Config(e) => Self::Config(e.to_string()),
            NodecheckError::Suite(SuiteError::Definition(msg)) => Self::Definition(msg),
            NodecheckError::Suite(SuiteError::Environment(msg)) => Self::Environment(msg),
            NodecheckError::Suite(SuiteError::Aborted(msg)) => {
                Self::Command(format!("suite aborted: {msg}"))
            }
            NodecheckError::Io(e) => Self::Io(e),
        }
    }
}

impl From<HarnessError> for CliError {
    fn from(e: HarnessError) -> Self {
        NodecheckError::from(e).into()
    }
}
