//! Error types shared across the workspace.
//!
//! Domain crates keep their own error enums and convert into
//! [`NodecheckError`] so the CLI can propagate everything with `?`.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum NodecheckError {
    /// Configuration loading or validation failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The validation suite could not run to completion.
    #[error("suite error: {0}")]
    Suite(#[from] SuiteError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config file is not valid TOML or does not match the schema.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds a value outside its allowed range.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors that stop a suite run.
///
/// Validation failures of the module under test are *not* errors; they are
/// recorded as scenario outcomes. Only problems with the harness itself or
/// with its environment end up here.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    /// The validation tool could not be invoked (missing binary,
    /// permissions, plugin download failure).
    #[error("environment error: {0}")]
    Environment(String),

    /// The scenario matrix is malformed (duplicate names, empty matrix).
    #[error("suite definition error: {0}")]
    Definition(String),

    /// The run was interrupted before all scenarios reported.
    #[error("suite aborted: {0}")]
    Aborted(String),
}
