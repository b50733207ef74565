#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;

// --- re-exports ---

// errors
pub use error::{ConfigError, NodecheckError, SuiteError};

// config
pub use config::{GeneralConfig, MatrixConfig, NodecheckConfig, ValidationConfig};
