//! Scenario outcomes and suite aggregation

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scenario::{Category, Scenario};
use crate::validator::{ToolInfo, Verdict};

/// Result status of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Module validated
    Pass,
    /// Module is malformed
    Fail,
    /// Scenario could not finish (timeout)
    Error,
}

impl Status {
    /// Lower-case identifier used in metrics and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Fail => f.write_str("FAIL"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// What happened when a scenario ran. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Pass, fail or error
    pub status: Status,
    /// Diagnostics (fail) or error description (error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wall-clock time of the scenario
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
}

impl Outcome {
    /// Outcome of a completed validation.
    pub fn from_verdict(verdict: Verdict, duration: Duration) -> Self {
        match verdict {
            Verdict::Valid => Self {
                status: Status::Pass,
                message: None,
                duration,
            },
            Verdict::Invalid { diagnostics } => Self {
                status: Status::Fail,
                message: Some(diagnostics),
                duration,
            },
        }
    }

    /// Outcome of a scenario that could not finish.
    pub fn error(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            duration,
        }
    }

    /// Whether the scenario passed.
    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }
}

/// A scenario paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// The scenario
    #[serde(flatten)]
    pub scenario: Scenario,
    /// Its outcome
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Per-category counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Axis
    pub category: Category,
    /// Scenarios run
    pub total: usize,
    /// Passed
    pub passed: usize,
    /// Failed
    pub failed: usize,
    /// Errored
    pub errored: usize,
}

impl CategorySummary {
    fn new(category: Category) -> Self {
        Self {
            category,
            total: 0,
            passed: 0,
            failed: 0,
            errored: 0,
        }
    }

    fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Pass => self.passed += 1,
            Status::Fail => self.failed += 1,
            Status::Error => self.errored += 1,
        }
    }
}

/// Every outcome of one suite run, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    /// Unique id of this run, for correlating logs
    pub run_id: String,
    /// True iff every outcome passed
    pub passed: bool,
    /// Tool found by preflight, if one ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolInfo>,
    /// Per-category counts, in order of first appearance
    pub summary: Vec<CategorySummary>,
    /// One entry per declared scenario
    pub results: Vec<ScenarioResult>,
    /// Wall-clock time of the whole run
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
}

impl SuiteResult {
    /// Combines scenario results into a suite verdict.
    ///
    /// The suite passes iff every outcome is `pass`. `results` is kept in
    /// the order given.
    pub fn aggregate(results: Vec<ScenarioResult>) -> Self {
        let mut summary: Vec<CategorySummary> = Vec::new();
        for result in &results {
            let category = result.scenario.category;
            let idx = match summary.iter().position(|s| s.category == category) {
                Some(idx) => idx,
                None => {
                    summary.push(CategorySummary::new(category));
                    summary.len() - 1
                }
            };
            summary[idx].record(result.outcome.status);
        }

        let duration = results.iter().map(|r| r.outcome.duration).max().unwrap_or_default();

        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            passed: results.iter().all(|r| r.outcome.is_pass()),
            tool: None,
            summary,
            results,
            duration,
        }
    }

    /// Number of outcomes with the given status.
    pub fn count(&self, status: Status) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.status == status)
            .count()
    }

    /// Results that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| !r.outcome.is_pass())
    }

    /// Summary for one category, if any scenario of it ran.
    pub fn summary_for(&self, category: Category) -> Option<&CategorySummary> {
        self.summary.iter().find(|s| s.category == category)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
