//! Metric names and descriptions.
//!
//! Every metric emitted through the `metrics` facade is named here. The
//! harness increments them with `metrics::counter!()` / `histogram!()`;
//! whoever installs a recorder decides where they go.
//!
//! # Naming
//!
//! - prefix: `nodecheck_`
//! - suffix: `_total` (counter), `_seconds` (histogram)
//!
//! ```ignore
//! use nodecheck_core::metrics;
//!
//! metrics::counter!(metrics::SCENARIOS_TOTAL, metrics::LABEL_STATUS => "pass").increment(1);
//! ```

// ─── label keys ────────────────────────────────────────────────────

/// Scenario status label key (pass, fail, error)
pub const LABEL_STATUS: &str = "status";

/// Scenario category label key
pub const LABEL_CATEGORY: &str = "category";

/// Tool subcommand label key (init, validate)
pub const LABEL_COMMAND: &str = "command";

// ─── suite metrics ─────────────────────────────────────────────────

/// Scenarios completed (counter, labels: status, category)
pub const SCENARIOS_TOTAL: &str = "nodecheck_scenarios_total";

/// Scenario wall-clock duration (histogram, seconds)
pub const SCENARIO_DURATION_SECONDS: &str = "nodecheck_scenario_duration_seconds";

/// Suites aborted by an environment error (counter)
pub const SUITES_ABORTED_TOTAL: &str = "nodecheck_suites_aborted_total";

// ─── tool metrics ──────────────────────────────────────────────────

/// Tool command invocations (counter, label: command)
pub const TOOL_INVOCATIONS_TOTAL: &str = "nodecheck_tool_invocations_total";

/// Tool command retries after a transient error (counter, label: command)
pub const TOOL_RETRIES_TOTAL: &str = "nodecheck_tool_retries_total";

/// Scenario duration buckets (seconds). `terraform init` dominates, so the
/// range runs from sub-second cache hits to multi-minute provider downloads.
pub const SCENARIO_DURATION_BUCKETS: [f64; 9] = [0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Registers descriptions for every metric.
///
/// Call once after installing a recorder.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        SCENARIOS_TOTAL,
        "Total number of scenarios completed, by status and category"
    );
    describe_histogram!(
        SCENARIO_DURATION_SECONDS,
        "Wall-clock time of a single scenario in seconds"
    );
    describe_counter!(
        SUITES_ABORTED_TOTAL,
        "Total number of suite runs aborted by an environment error"
    );
    describe_counter!(
        TOOL_INVOCATIONS_TOTAL,
        "Total number of validation tool commands executed"
    );
    describe_counter!(
        TOOL_RETRIES_TOTAL,
        "Total number of tool command retries after transient errors"
    );
}
