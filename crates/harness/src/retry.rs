//! Retry policy for transient tool errors
//!
//! `terraform init` talks to provider registries and module sources over the
//! network. Failures that look like network hiccups are retried here, in the
//! options layer; scenario logic never retries on its own.

use std::time::Duration;

use regex::Regex;

use crate::error::HarnessError;

/// Built-in transient error catalogue: `(pattern, description)`.
const DEFAULT_RETRYABLE_ERRORS: &[(&str, &str)] = &[
    (
        r"(?s).*read: connection reset by peer.*",
        "connection reset while fetching dependencies",
    ),
    (
        r"(?s).*TLS handshake timeout.*",
        "TLS handshake timeout while fetching dependencies",
    ),
    (
        r"(?s).*Client\.Timeout exceeded while awaiting headers.*",
        "registry request timed out",
    ),
    (
        r"(?s).*registry service is unreachable.*",
        "provider registry unreachable",
    ),
    (
        r"(?s).*could not query provider registry for.*",
        "provider registry query failed",
    ),
    (
        r"(?s).*Failed to query available provider packages.*",
        "provider package query failed",
    ),
    (
        r"(?s).*Could not retrieve the list of available versions for provider.*",
        "provider version listing failed",
    ),
    (
        r"(?s).*Error installing provider.*",
        "provider installation failed",
    ),
    (
        r"(?s).*Failed to install provider.*",
        "provider installation failed",
    ),
    (
        r"(?s).*unable to verify (signature|checksum).*",
        "provider download corrupted",
    ),
    (
        r"(?s).*timeout while waiting for plugin to start.*",
        "plugin start timed out",
    ),
    (
        r"(?s).*timed out waiting for server handshake.*",
        "plugin handshake timed out",
    ),
    (
        r"(?s).*Could not download module.*(429|5\d\d).*",
        "module source rate limited or unavailable",
    ),
    (
        r"(?s).*dial tcp.*(i/o timeout|connection refused|no such host).*",
        "network unreachable",
    ),
];

/// A compiled transient-error pattern.
#[derive(Debug, Clone)]
struct RetryableError {
    pattern: Regex,
    description: String,
}

/// How transient tool errors are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    max_retries: u32,
    /// Base delay; attempt `n` waits `backoff * n`
    backoff: Duration,
    retryable: Vec<RetryableError>,
}

impl RetryPolicy {
    /// Policy with the built-in error catalogue.
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        let retryable = DEFAULT_RETRYABLE_ERRORS
            .iter()
            .filter_map(|(pattern, description)| {
                Regex::new(pattern).ok().map(|pattern| RetryableError {
                    pattern,
                    description: (*description).to_owned(),
                })
            })
            .collect();
        Self {
            max_retries,
            backoff,
            retryable,
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
            retryable: Vec::new(),
        }
    }

    /// Adds user-supplied patterns on top of the catalogue.
    ///
    /// # Errors
    ///
    /// `HarnessError::Config` if a pattern is not a valid regex.
    pub fn with_extra_patterns<I, S>(mut self, patterns: I) -> Result<Self, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in patterns {
            let raw = raw.as_ref();
            let pattern = Regex::new(raw).map_err(|e| HarnessError::Config {
                field: "extra_retryable_errors".to_owned(),
                reason: format!("invalid pattern '{raw}': {e}"),
            })?;
            self.retryable.push(RetryableError {
                pattern,
                description: format!("matched custom pattern '{raw}'"),
            });
        }
        Ok(self)
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Returns the description of the first transient pattern matching
    /// `output`, or `None` if the failure is not retryable.
    pub fn classify(&self, output: &str) -> Option<&str> {
        self.retryable
            .iter()
            .find(|r| r.pattern.is_match(output))
            .map(|r| r.description.as_str())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_patterns_all_compile() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retryable.len(), DEFAULT_RETRYABLE_ERRORS.len());
    }

    #[test]
    fn classifies_registry_failure_as_transient() {
        let policy = RetryPolicy::default();
        let output = "Initializing provider plugins...\n\
                      Error: Failed to query available provider packages\n\n\
                      Could not retrieve the list of available versions for provider \
                      siderolabs/talos: could not connect to registry.terraform.io";
        assert!(policy.classify(output).is_some());
    }

    #[test]
    fn classifies_connection_reset_across_lines() {
        let policy = RetryPolicy::default();
        let output = "Error: Failed to download\n  read: connection reset by peer\n";
        assert_eq!(
            policy.classify(output),
            Some("connection reset while fetching dependencies")
        );
    }

    #[test]
    fn syntax_error_is_not_transient() {
        let policy = RetryPolicy::default();
        let output = "Error: Argument or block definition required\n\n\
                      on main.tf line 12: An argument or block definition is required here.";
        assert!(policy.classify(output).is_none());
    }

    #[test]
    fn none_policy_never_matches() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries(), 0);
        assert!(policy.classify("read: connection reset by peer").is_none());
    }

    #[test]
    fn extra_patterns_are_appended() {
        let policy = RetryPolicy::none()
            .with_extra_patterns(["mirror .* unavailable"])
            .unwrap();
        assert!(policy.classify("provider mirror eu-1 unavailable").is_some());
    }

    #[test]
    fn invalid_extra_pattern_is_config_error() {
        let err = RetryPolicy::none()
            .with_extra_patterns(["(unclosed"])
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config { .. }));
    }

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(300));
    }
}
