//! Integration tests for `nodecheck config`.
//!
//! Config validation and display against real TOML files.

use std::fs;

use nodecheck_core::config::NodecheckConfig;
use tempfile::TempDir;

#[tokio::test]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("nodecheck.toml");

    let valid_config = r#"
[general]
log_level = "debug"
log_format = "json"

[validation]
module_dir = "./modules/control-plane"
max_parallel = 2

[matrix]
bootstrap_roles = ["BootstrapNode", "JoiningNode"]
"#;
    fs::write(&config_path, valid_config).expect("should write config");

    // When: Loading the config
    let config = NodecheckConfig::load(&config_path)
        .await
        .expect("valid config should load successfully");

    // Then: File values win, the rest keeps defaults
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.validation.max_parallel, 2);
    assert_eq!(config.validation.terraform_bin, "terraform");
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    // Given: A malformed TOML file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[validation\nmax_parallel = 2\n").expect("should write bad config");

    // When: Loading the config
    let result = NodecheckConfig::load(&config_path).await;

    // Then: Should fail
    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let result = NodecheckConfig::load("/nonexistent/nodecheck.toml").await;
    assert!(result.is_err(), "missing file should fail to load");
}

#[tokio::test]
async fn test_config_validate_out_of_range_value() {
    // Given: A scenario timeout beyond the allowed range
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("nodecheck.toml");
    fs::write(
        &config_path,
        "[validation]\nscenario_timeout_secs = 999999\n",
    )
    .expect("should write config");

    // When
    let err = NodecheckConfig::load(&config_path)
        .await
        .expect_err("out of range value should be rejected");

    // Then: The offending field is named
    assert!(err.to_string().contains("scenario_timeout_secs"));
}

#[tokio::test]
async fn test_config_show_roundtrips_through_toml() {
    // Given: A loaded config
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("nodecheck.toml");
    fs::write(&config_path, "[matrix]\ninstance_types = [\"m6i.large\"]\n")
        .expect("should write config");
    let config = NodecheckConfig::load(&config_path).await.expect("should load");

    // When: Rendering it the way `config show` does
    let rendered = toml::to_string_pretty(&config).expect("config should serialize");

    // Then: The rendered TOML parses back to the same values
    let reparsed = NodecheckConfig::parse(&rendered).expect("rendered TOML should parse");
    assert_eq!(reparsed.matrix.instance_types, vec!["m6i.large"]);
    assert_eq!(reparsed.validation.max_retries, config.validation.max_retries);
}
