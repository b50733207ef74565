#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`HarnessError`)
//! - [`scenario`]: Scenario tables (`Scenario`, `Category`, `TestGroup`, `ScenarioMatrix`)
//! - [`target`]: Per-scenario scratch targets (`ValidationTarget`, `TargetOptions`)
//! - [`retry`]: Transient tool error handling (`RetryPolicy`)
//! - [`validator`]: Validation tool abstraction (`Validator` trait, `Verdict`)
//! - [`terraform`]: Terraform driver (`TerraformValidator`)
//! - [`outcome`]: Outcomes and aggregation (`Outcome`, `SuiteResult`)
//! - [`runner`]: Matrix execution (`ScenarioRunner`, `RunnerConfig`)
//!
//! # Architecture
//!
//! ```text
//! ScenarioMatrix --scenarios()--> ScenarioRunner::run_suite()
//!                                      |
//!                                 Validator.preflight()
//!                                      |
//!                      per scenario: ValidationTarget::prepare()
//!                                      |
//!                                 Validator.validate()
//!                                      |
//!                                 SuiteResult::aggregate()
//! ```

pub mod error;
pub mod outcome;
pub mod retry;
pub mod runner;
pub mod scenario;
pub mod target;
pub mod terraform;
pub mod validator;

// --- Public API Re-exports ---

// Runner
pub use runner::{RunnerConfig, RunnerConfigBuilder, ScenarioRunner};

// Error
pub use error::HarnessError;

// Scenarios
pub use scenario::{Category, STRUCTURAL_SCENARIO, Scenario, ScenarioMatrix, TestGroup};

// Targets
pub use retry::RetryPolicy;
pub use target::{TargetOptions, ValidationTarget};

// Tool
pub use terraform::TerraformValidator;
pub use validator::{ToolInfo, Validator, Verdict};

// Outcomes
pub use outcome::{CategorySummary, Outcome, ScenarioResult, Status, SuiteResult};
