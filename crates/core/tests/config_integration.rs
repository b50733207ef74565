//! nodecheck.toml loading tests
//!
//! - nodecheck.toml.example parsing
//! - partial configs (some sections only)
//! - file loading and missing-file fallback
//! - malformed input errors

use nodecheck_core::config::{MatrixConfig, NodecheckConfig};
use nodecheck_core::error::{ConfigError, NodecheckError};

const EXAMPLE: &str = include_str!("../../../nodecheck.toml.example");

// =============================================================================
// nodecheck.toml.example
// =============================================================================

#[test]
fn example_config_parses_and_validates() {
    let config = NodecheckConfig::parse(EXAMPLE).expect("example config should parse");
    config
        .validate()
        .expect("example config should pass validation");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
}

#[test]
fn example_config_validation_section() {
    let config = NodecheckConfig::parse(EXAMPLE).expect("should parse");

    assert_eq!(config.validation.module_dir, "./modules/control-plane");
    assert_eq!(config.validation.terraform_bin, "terraform");
    assert!(config.validation.no_color);
    assert!(!config.validation.backend);
    assert!(config.validation.isolate_workdir);
    assert_eq!(config.validation.max_parallel, 4);
    assert_eq!(config.validation.max_retries, 3);
    assert_eq!(config.validation.retry_backoff_secs, 5);
    assert!(config.validation.extra_retryable_errors.is_empty());
}

#[test]
fn example_matrix_matches_defaults() {
    let config = NodecheckConfig::parse(EXAMPLE).expect("should parse");
    let defaults = MatrixConfig::default();

    assert_eq!(config.matrix.topologies, defaults.topologies);
    assert_eq!(config.matrix.instance_types, defaults.instance_types);
    assert_eq!(config.matrix.bootstrap_roles, defaults.bootstrap_roles);
    assert_eq!(
        config.matrix.topologies.len()
            + config.matrix.instance_types.len()
            + config.matrix.bootstrap_roles.len(),
        15
    );
}

// =============================================================================
// partial configs
// =============================================================================

#[test]
fn empty_config_uses_defaults() {
    let config = NodecheckConfig::parse("").expect("empty config should parse");
    config.validate().expect("defaults should validate");
    assert_eq!(config.validation.module_dir, ".");
    assert_eq!(config.matrix.instance_types.len(), 10);
}

#[test]
fn matrix_only_config_keeps_validation_defaults() {
    let config = NodecheckConfig::parse(
        r#"
[matrix]
instance_types = ["m6i.large"]
"#,
    )
    .expect("should parse");

    assert_eq!(config.matrix.instance_types, vec!["m6i.large"]);
    assert_eq!(config.matrix.bootstrap_roles.len(), 2);
    assert_eq!(config.validation.command_timeout_secs, 300);
}

// =============================================================================
// files
// =============================================================================

#[tokio::test]
async fn from_file_reads_toml() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nodecheck.toml");
    tokio::fs::write(&path, "[validation]\nmax_parallel = 2\n")
        .await
        .unwrap();

    let config = NodecheckConfig::from_file(&path).await.unwrap();
    assert_eq!(config.validation.max_parallel, 2);
}

#[tokio::test]
async fn missing_file_is_file_not_found() {
    let err = NodecheckConfig::from_file("/nonexistent/nodecheck.toml")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NodecheckError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn load_or_default_tolerates_missing_file() {
    let config = NodecheckConfig::load_or_default("/nonexistent/nodecheck.toml")
        .await
        .unwrap();
    assert_eq!(config.matrix.topologies.len(), 3);
}

#[tokio::test]
async fn from_file_rejects_invalid_values() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nodecheck.toml");
    tokio::fs::write(&path, "[validation]\nmax_parallel = 0\n")
        .await
        .unwrap();

    let err = NodecheckConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        NodecheckError::Config(ConfigError::InvalidValue { .. })
    ));
}

// =============================================================================
// malformed input
// =============================================================================

#[test]
fn malformed_toml_is_parse_error() {
    let err = NodecheckConfig::parse("[validation\nmax_parallel = ").unwrap_err();
    assert!(matches!(
        err,
        NodecheckError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn wrong_type_is_parse_error() {
    let err = NodecheckConfig::parse("[validation]\nmax_parallel = \"four\"\n").unwrap_err();
    assert!(matches!(
        err,
        NodecheckError::Config(ConfigError::ParseFailed { .. })
    ));
}
