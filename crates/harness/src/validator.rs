//! Validation tool abstraction for testability.
//!
//! The [`Validator`] trait is the only thing the runner knows about the
//! external tool. Production code uses
//! [`TerraformValidator`](crate::terraform::TerraformValidator); tests plug in
//! fakes that return canned verdicts.
//!
//! ```text
//! ┌────────────────┐
//! │ ScenarioRunner │
//! └───────┬────────┘
//!         │
//!         ▼
//!   ┌───────────┐
//!   │ Validator │ (trait)
//!   └───────────┘
//!      │     │
//!      ▼     ▼
//! ┌─────────┐ ┌──────┐
//! │Terraform│ │ Fake │
//! └────┬────┘ └──────┘
//!      │
//!      ▼
//!  terraform init / validate
//! ```
//!
//! # Contract
//!
//! | tool result                          | maps to                          |
//! |--------------------------------------|----------------------------------|
//! | configuration is valid               | `Ok(Verdict::Valid)`             |
//! | configuration is malformed           | `Ok(Verdict::Invalid { .. })`    |
//! | tool missing / unusable / unreachable| `Err(HarnessError::Environment)` |
//! | command ran past its limit           | `Err(HarnessError::Timeout)`     |

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::target::ValidationTarget;

/// Result of validating a well-invoked module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The module is well-formed
    Valid,
    /// The module is malformed; `diagnostics` is the tool's text verbatim
    Invalid {
        /// Diagnostic text
        diagnostics: String,
    },
}

impl Verdict {
    /// Whether the module passed.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Identification of the tool found by [`Validator::preflight`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name, e.g. `terraform`
    pub name: String,
    /// Version string as reported by the tool
    pub version: String,
}

/// Trait abstracting the validation tool.
///
/// `Send + Sync + 'static` so one instance can be shared (behind `Arc`) by
/// every concurrent scenario task. Implementations must not keep mutable
/// per-target state: all per-scenario state lives in the
/// [`ValidationTarget`].
pub trait Validator: Send + Sync + 'static {
    /// Checks the tool is installed and runnable.
    ///
    /// Called once before any scenario runs, so a missing tool aborts the
    /// suite before a single outcome is recorded.
    ///
    /// # Errors
    ///
    /// `HarnessError::Environment` if the tool cannot be invoked.
    fn preflight(&self) -> impl Future<Output = Result<ToolInfo, HarnessError>> + Send;

    /// Initialises and structurally validates the target.
    ///
    /// Initialisation must be idempotent; it is repeated for every target.
    ///
    /// # Errors
    ///
    /// - `HarnessError::Environment`: invocation failed (suite-fatal)
    /// - `HarnessError::Timeout`: the tool did not finish in time
    fn validate(
        &self,
        target: &ValidationTarget,
    ) -> impl Future<Output = Result<Verdict, HarnessError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_is_valid() {
        assert!(Verdict::Valid.is_valid());
        assert!(
            !Verdict::Invalid {
                diagnostics: "Error: Unsupported block type".to_owned()
            }
            .is_valid()
        );
    }

    #[test]
    fn verdict_serializes_tagged() {
        let json = serde_json::to_value(Verdict::Invalid {
            diagnostics: "bad".to_owned(),
        })
        .unwrap();
        assert_eq!(json["verdict"], "invalid");
        assert_eq!(json["diagnostics"], "bad");
    }
}
