//! Configuration: `nodecheck.toml` parsing and runtime settings.
//!
//! [`NodecheckConfig`] is the root structure holding every section.
//!
//! # Load order
//! 1. CLI arguments (highest)
//! 2. Environment variables (`NODECHECK_VALIDATION_MODULE_DIR=./infra` form)
//! 3. Config file (`nodecheck.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), nodecheck_core::error::NodecheckError> {
//! use nodecheck_core::config::NodecheckConfig;
//!
//! // load from file, then apply env overrides
//! let config = NodecheckConfig::load("nodecheck.toml").await?;
//!
//! // parse a TOML string directly
//! let config = NodecheckConfig::parse("[validation]\nmax_parallel = 2")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, NodecheckError};

/// Upper bound for `validation.max_parallel`.
const MAX_PARALLEL_LIMIT: usize = 64;
/// Upper bound for `validation.max_retries`.
const MAX_RETRIES_LIMIT: u32 = 10;
/// Upper bound for any timeout, in seconds (2 hours).
const MAX_TIMEOUT_SECS: u64 = 7_200;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodecheckConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Validation tool invocation settings
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Scenario tables
    #[serde(default)]
    pub matrix: MatrixConfig,
}

impl NodecheckConfig {
    /// Loads a TOML file, applies env overrides and validates the result.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, NodecheckError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but falls back to defaults (plus env
    /// overrides) when the file does not exist.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, NodecheckError> {
        let path = path.as_ref();
        match Self::load(path).await {
            Err(NodecheckError::Config(ConfigError::FileNotFound { .. })) => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Loads a TOML file without env overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, NodecheckError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NodecheckError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                NodecheckError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, NodecheckError> {
        toml::from_str(toml_str).map_err(|e| {
            NodecheckError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Overrides values from environment variables.
    ///
    /// Naming: `NODECHECK_{SECTION}_{FIELD}`, e.g.
    /// `NODECHECK_VALIDATION_TERRAFORM_BIN=/usr/local/bin/terraform`.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "NODECHECK_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "NODECHECK_GENERAL_LOG_FORMAT");

        // Validation
        override_string(
            &mut self.validation.module_dir,
            "NODECHECK_VALIDATION_MODULE_DIR",
        );
        override_string(
            &mut self.validation.terraform_bin,
            "NODECHECK_VALIDATION_TERRAFORM_BIN",
        );
        override_bool(&mut self.validation.no_color, "NODECHECK_VALIDATION_NO_COLOR");
        override_bool(&mut self.validation.backend, "NODECHECK_VALIDATION_BACKEND");
        override_bool(
            &mut self.validation.isolate_workdir,
            "NODECHECK_VALIDATION_ISOLATE_WORKDIR",
        );
        override_usize(
            &mut self.validation.max_parallel,
            "NODECHECK_VALIDATION_MAX_PARALLEL",
        );
        override_bool(
            &mut self.validation.reuse_validation,
            "NODECHECK_VALIDATION_REUSE_VALIDATION",
        );
        override_u64(
            &mut self.validation.scenario_timeout_secs,
            "NODECHECK_VALIDATION_SCENARIO_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.validation.command_timeout_secs,
            "NODECHECK_VALIDATION_COMMAND_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.validation.max_retries,
            "NODECHECK_VALIDATION_MAX_RETRIES",
        );
        override_u64(
            &mut self.validation.retry_backoff_secs,
            "NODECHECK_VALIDATION_RETRY_BACKOFF_SECS",
        );

        // Matrix
        override_csv(&mut self.matrix.topologies, "NODECHECK_MATRIX_TOPOLOGIES");
        override_csv(
            &mut self.matrix.instance_types,
            "NODECHECK_MATRIX_INSTANCE_TYPES",
        );
        override_csv(
            &mut self.matrix.bootstrap_roles,
            "NODECHECK_MATRIX_BOOTSTRAP_ROLES",
        );
    }

    /// Validates field values.
    ///
    /// Matrix bookkeeping (duplicates, emptiness) is checked by the harness
    /// when the suite is built, not here.
    pub fn validate(&self) -> Result<(), NodecheckError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.validation.module_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "validation.module_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.validation.terraform_bin.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "validation.terraform_bin".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.validation.max_parallel == 0 || self.validation.max_parallel > MAX_PARALLEL_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "validation.max_parallel".to_owned(),
                reason: format!("must be 1-{MAX_PARALLEL_LIMIT}"),
            }
            .into());
        }

        // without isolation every scenario runs init in the same directory
        if !self.validation.isolate_workdir
            && self.validation.max_parallel > 1
            && !self.validation.reuse_validation
        {
            return Err(ConfigError::InvalidValue {
                field: "validation.max_parallel".to_owned(),
                reason: "must be 1 when validation.isolate_workdir is false".to_owned(),
            }
            .into());
        }

        for (field, secs) in [
            (
                "validation.scenario_timeout_secs",
                self.validation.scenario_timeout_secs,
            ),
            (
                "validation.command_timeout_secs",
                self.validation.command_timeout_secs,
            ),
        ] {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
                }
                .into());
            }
        }

        if self.validation.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "validation.max_retries".to_owned(),
                reason: format!("must be 0-{MAX_RETRIES_LIMIT}"),
            }
            .into());
        }

        if self.validation.retry_backoff_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "validation.retry_backoff_secs".to_owned(),
                reason: format!("must be 0-{MAX_TIMEOUT_SECS}"),
            }
            .into());
        }

        for pattern in &self.validation.extra_retryable_errors {
            if pattern.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "validation.extra_retryable_errors".to_owned(),
                    reason: "patterns must not be empty".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// How the validation tool is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Directory of the module under test
    pub module_dir: String,
    /// Terraform binary (name on `PATH` or absolute path)
    pub terraform_bin: String,
    /// Pass `-no-color` so tool output stays parseable
    pub no_color: bool,
    /// Initialise the configured backend (`false` runs `init -backend=false`)
    pub backend: bool,
    /// Copy the module into a private scratch directory per scenario
    pub isolate_workdir: bool,
    /// Maximum scenarios in flight
    pub max_parallel: usize,
    /// Validate once and reuse the verdict for every scenario
    pub reuse_validation: bool,
    /// Wall-clock limit per scenario (seconds)
    pub scenario_timeout_secs: u64,
    /// Wall-clock limit per tool command (seconds)
    pub command_timeout_secs: u64,
    /// Retries for transient tool errors
    pub max_retries: u32,
    /// Base backoff between retries (seconds), multiplied by the attempt number
    pub retry_backoff_secs: u64,
    /// Additional regexes treated as transient, on top of the built-in set
    pub extra_retryable_errors: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            module_dir: ".".to_owned(),
            terraform_bin: "terraform".to_owned(),
            no_color: true,
            backend: false,
            isolate_workdir: true,
            max_parallel: 4,
            reuse_validation: false,
            scenario_timeout_secs: 600,
            command_timeout_secs: 300,
            max_retries: 3,
            retry_backoff_secs: 5,
            extra_retryable_errors: Vec::new(),
        }
    }
}

/// Scenario tables. Each entry becomes one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Topology scenario names
    pub topologies: Vec<String>,
    /// Instance type labels (scenario name `InstanceType_<label>`)
    pub instance_types: Vec<String>,
    /// Bootstrap role scenario names
    pub bootstrap_roles: Vec<String>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            topologies: to_owned_vec(&[
                "ValidSingleControlPlane",
                "ValidHAControlPlane",
                "ValidProductionCPNode",
            ]),
            instance_types: to_owned_vec(&[
                "t3.medium",
                "t3.large",
                "t3.xlarge",
                "t3.2xlarge",
                "t3a.medium",
                "t3a.large",
                "c5.large",
                "c5.xlarge",
                "m5.large",
                "m5.xlarge",
            ]),
            bootstrap_roles: to_owned_vec(&["BootstrapNode", "JoiningNode"]),
        }
    }
}

fn to_owned_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = NodecheckConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.validation.terraform_bin, "terraform");
        assert!(config.validation.no_color);
        assert!(config.validation.isolate_workdir);
        assert!(!config.validation.reuse_validation);
        assert_eq!(config.validation.max_retries, 3);
    }

    #[test]
    fn default_config_passes_validation() {
        NodecheckConfig::default().validate().unwrap();
    }

    #[test]
    fn default_matrix_has_fifteen_entries() {
        let matrix = MatrixConfig::default();
        assert_eq!(matrix.topologies.len(), 3);
        assert_eq!(matrix.instance_types.len(), 10);
        assert_eq!(matrix.bootstrap_roles.len(), 2);
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = NodecheckConfig::parse("").unwrap();
        assert_eq!(config.validation.module_dir, ".");
        assert_eq!(config.matrix.instance_types.len(), 10);
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[validation]
module_dir = "../modules/talos-cp-node"
max_parallel = 2

[matrix]
instance_types = ["m6i.large"]
"#;
        let config = NodecheckConfig::parse(toml).unwrap();
        assert_eq!(config.validation.module_dir, "../modules/talos-cp-node");
        assert_eq!(config.validation.max_parallel, 2);
        // untouched fields keep defaults
        assert_eq!(config.validation.command_timeout_secs, 300);
        assert_eq!(config.matrix.instance_types, vec!["m6i.large"]);
        assert_eq!(config.matrix.topologies.len(), 3);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = NodecheckConfig::parse("invalid = [[[toml");
        assert!(matches!(
            result,
            Err(NodecheckError::Config(ConfigError::ParseFailed { .. }))
        ));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = NodecheckConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn validate_rejects_zero_parallelism() {
        let mut config = NodecheckConfig::default();
        config.validation.max_parallel = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_shared_workdir_with_parallelism() {
        let mut config = NodecheckConfig::default();
        config.validation.isolate_workdir = false;
        config.validation.max_parallel = 4;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("isolate_workdir"));

        config.validation.max_parallel = 1;
        assert!(config.validate().is_ok());

        config.validation.max_parallel = 4;
        config.validation.reuse_validation = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let mut config = NodecheckConfig::default();
        config.validation.command_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("command_timeout_secs"));
    }

    #[test]
    fn validate_rejects_too_many_retries() {
        let mut config = NodecheckConfig::default();
        config.validation.max_retries = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_terraform_bin() {
        let mut config = NodecheckConfig::default();
        config.validation.terraform_bin = "  ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        // SAFETY: serialised with other env-mutating tests
        unsafe {
            std::env::set_var("NODECHECK_VALIDATION_MAX_PARALLEL", "8");
            std::env::set_var("NODECHECK_MATRIX_BOOTSTRAP_ROLES", "BootstrapNode, ");
        }
        let mut config = NodecheckConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("NODECHECK_VALIDATION_MAX_PARALLEL");
            std::env::remove_var("NODECHECK_MATRIX_BOOTSTRAP_ROLES");
        }

        assert_eq!(config.validation.max_parallel, 8);
        assert_eq!(config.matrix.bootstrap_roles, vec!["BootstrapNode"]);
    }

    #[test]
    #[serial]
    fn env_override_with_bad_number_is_ignored() {
        unsafe {
            std::env::set_var("NODECHECK_VALIDATION_MAX_RETRIES", "many");
        }
        let mut config = NodecheckConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("NODECHECK_VALIDATION_MAX_RETRIES");
        }
        assert_eq!(config.validation.max_retries, 3);
    }
}
