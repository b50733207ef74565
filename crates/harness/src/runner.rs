//! Scenario runner
//!
//! [`ScenarioRunner`] drives a [`Validator`] across a scenario matrix:
//!
//! ```text
//! run_suite(scenarios)
//!   │
//!   ├─ validate_scenarios()      duplicate / empty → SuiteDefinition
//!   ├─ validator.preflight()     tool missing      → Environment (no outcomes)
//!   │
//!   ├─ JoinSet + Semaphore(max_parallel)
//!   │    └─ per scenario: prepare target → validate → Outcome
//!   │         ├─ Valid / Invalid → pass / fail
//!   │         ├─ Timeout         → error (suite continues)
//!   │         └─ Environment     → abort_all(), suite returns Err
//!   │
//!   └─ SuiteResult::aggregate()  declaration order, pass iff all pass
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use nodecheck_core::config::ValidationConfig;
use nodecheck_core::metrics as m;

use crate::error::HarnessError;
use crate::outcome::{Outcome, ScenarioResult, SuiteResult};
use crate::scenario::{Scenario, validate_scenarios};
use crate::target::{TargetOptions, ValidationTarget};
use crate::validator::Validator;

/// Upper bound on concurrently running scenarios.
const MAX_PARALLEL_LIMIT: usize = 64;

/// Runner settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Scenarios in flight at once
    pub max_parallel: usize,
    /// Limit for one scenario, preparation included
    pub scenario_timeout: Duration,
    /// Validate once and stamp the verdict on every scenario
    pub reuse_validation: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            scenario_timeout: Duration::from_secs(600),
            reuse_validation: false,
        }
    }
}

impl RunnerConfig {
    /// Builds runner settings from the `[validation]` config section.
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            max_parallel: config.max_parallel,
            scenario_timeout: Duration::from_secs(config.scenario_timeout_secs),
            reuse_validation: config.reuse_validation,
        }
    }

    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// `HarnessError::Config` when a value is out of range.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.max_parallel == 0 || self.max_parallel > MAX_PARALLEL_LIMIT {
            return Err(HarnessError::Config {
                field: "max_parallel".to_owned(),
                reason: format!("must be between 1 and {MAX_PARALLEL_LIMIT}"),
            });
        }
        if self.scenario_timeout.is_zero() {
            return Err(HarnessError::Config {
                field: "scenario_timeout".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}

/// [`RunnerConfig`] builder, validated on build.
#[derive(Debug, Default)]
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    /// Builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the concurrency limit.
    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.config.max_parallel = max_parallel;
        self
    }

    /// Sets the per-scenario time limit.
    pub fn scenario_timeout(mut self, timeout: Duration) -> Self {
        self.config.scenario_timeout = timeout;
        self
    }

    /// Enables or disables shared validation.
    pub fn reuse_validation(mut self, reuse: bool) -> Self {
        self.config.reuse_validation = reuse;
        self
    }

    /// Validates and builds.
    ///
    /// # Errors
    ///
    /// `HarnessError::Config` when a value is out of range.
    pub fn build(self) -> Result<RunnerConfig, HarnessError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Runs scenarios against a shared validator.
///
/// Cloning is cheap; every spawned scenario task holds its own clone.
pub struct ScenarioRunner<V: Validator> {
    validator: Arc<V>,
    options: Arc<TargetOptions>,
    config: RunnerConfig,
}

impl<V: Validator> Clone for ScenarioRunner<V> {
    fn clone(&self) -> Self {
        Self {
            validator: Arc::clone(&self.validator),
            options: Arc::clone(&self.options),
            config: self.config.clone(),
        }
    }
}

impl<V: Validator> ScenarioRunner<V> {
    /// Creates a runner.
    pub fn new(validator: Arc<V>, options: TargetOptions, config: RunnerConfig) -> Self {
        Self {
            validator,
            options: Arc::new(options),
            config,
        }
    }

    /// Runner settings.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Options every target is prepared with.
    pub fn options(&self) -> &TargetOptions {
        &self.options
    }

    /// Initialises and validates an already prepared target.
    ///
    /// A malformed module yields a `fail` outcome carrying the tool's
    /// diagnostics. Initialisation is repeated on every call.
    ///
    /// # Errors
    ///
    /// `HarnessError::Environment` if the tool could not be invoked,
    /// `HarnessError::Timeout` if a tool command ran out of time.
    pub async fn run_structural_validation(
        &self,
        target: &ValidationTarget,
    ) -> Result<Outcome, HarnessError> {
        let started = Instant::now();
        let verdict = self.validator.validate(target).await?;
        Ok(Outcome::from_verdict(verdict, started.elapsed()))
    }

    /// Runs one scenario against a fresh target.
    ///
    /// The scenario label is recorded for reporting only; every category
    /// validates the same module. Running past `scenario_timeout` yields an
    /// `error` outcome rather than an `Err`.
    ///
    /// # Errors
    ///
    /// Suite-fatal errors only (`Environment`, `Io`, `Aborted`).
    pub async fn run_scenario(&self, scenario: &Scenario) -> Result<Outcome, HarnessError> {
        let outcome = self.execute_scenario(scenario).await?;
        record_outcome(scenario, &outcome);
        Ok(outcome)
    }

    /// Prepares a fresh target for `scenario` and validates it under the
    /// scenario time limit. The outcome duration covers preparation too.
    async fn execute_scenario(&self, scenario: &Scenario) -> Result<Outcome, HarnessError> {
        let started = Instant::now();
        let scenario_timeout = self.config.scenario_timeout;
        debug!(scenario = %scenario.name, category = %scenario.category, "scenario started");

        let work = async {
            let target = ValidationTarget::prepare(&self.options, scenario).await?;
            self.run_structural_validation(&target).await
        };

        match tokio::time::timeout(scenario_timeout, work).await {
            Ok(Ok(outcome)) => Ok(Outcome {
                duration: started.elapsed(),
                ..outcome
            }),
            Ok(Err(e)) if !e.is_fatal() => {
                warn!(scenario = %scenario.name, error = %e, "scenario could not finish");
                Ok(Outcome::error(e.to_string(), started.elapsed()))
            }
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => {
                let e = HarnessError::Timeout {
                    what: format!("scenario '{}'", scenario.name),
                    after: scenario_timeout,
                };
                warn!(scenario = %scenario.name, error = %e, "scenario timed out");
                Ok(Outcome::error(e.to_string(), started.elapsed()))
            }
        }
    }

    /// Runs every scenario and aggregates the results.
    ///
    /// Checks the suite definition and the tool before starting anything,
    /// so neither problem leaves partial outcomes behind. The first fatal
    /// error cancels all in-flight scenarios and is returned; no
    /// [`SuiteResult`] is produced in that case.
    ///
    /// # Errors
    ///
    /// - `HarnessError::SuiteDefinition`: empty matrix or duplicate names
    /// - `HarnessError::Config`: invalid runner settings
    /// - `HarnessError::Environment`: tool missing or unusable
    pub async fn run_suite(&self, scenarios: Vec<Scenario>) -> Result<SuiteResult, HarnessError> {
        validate_scenarios(&scenarios)?;
        self.config.validate()?;
        if !self.options.isolate_workdir
            && self.config.max_parallel > 1
            && !self.config.reuse_validation
        {
            return Err(HarnessError::Config {
                field: "max_parallel".to_owned(),
                reason: "must be 1 when targets share the module directory".to_owned(),
            });
        }

        let tool = self.validator.preflight().await.inspect_err(|e| {
            metrics::counter!(m::SUITES_ABORTED_TOTAL).increment(1);
            error!(error = %e, "validation tool preflight failed, suite aborted");
        })?;

        let started = Instant::now();
        info!(
            scenarios = scenarios.len(),
            max_parallel = self.config.max_parallel,
            reuse_validation = self.config.reuse_validation,
            tool = %tool.name,
            version = %tool.version,
            "suite started"
        );

        let results = if self.config.reuse_validation {
            self.run_shared(scenarios).await
        } else {
            self.run_concurrent(scenarios).await
        };
        let results = results.inspect_err(|e| {
            metrics::counter!(m::SUITES_ABORTED_TOTAL).increment(1);
            error!(error = %e, "suite aborted");
        })?;

        let mut suite = SuiteResult::aggregate(results);
        suite.tool = Some(tool);
        suite.duration = started.elapsed();

        info!(
            run_id = %suite.run_id,
            passed = suite.passed,
            total = suite.results.len(),
            failed = suite.failures().count(),
            duration_ms = u64::try_from(suite.duration.as_millis()).unwrap_or(u64::MAX),
            "suite finished"
        );
        Ok(suite)
    }

    /// One task per scenario, bounded by a semaphore.
    async fn run_concurrent(
        &self,
        scenarios: Vec<Scenario>,
    ) -> Result<Vec<ScenarioResult>, HarnessError> {
        let total = scenarios.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel));
        let mut tasks = JoinSet::new();

        for (index, scenario) in scenarios.into_iter().enumerate() {
            let runner = self.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| HarnessError::Aborted("scenario semaphore closed".to_owned()))?;
                let outcome = runner.execute_scenario(&scenario).await?;
                record_outcome(&scenario, &outcome);
                Ok::<_, HarnessError>((index, ScenarioResult { scenario, outcome }))
            });
        }

        let mut slots: Vec<Option<ScenarioResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let finished = joined
                .map_err(|e| HarnessError::Aborted(format!("scenario task failed: {e}")))
                .and_then(|result| result);

            match finished {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| HarnessError::Aborted("scenario finished without an outcome".to_owned()))
    }

    /// Validates once and stamps the outcome on every scenario.
    async fn run_shared(
        &self,
        scenarios: Vec<Scenario>,
    ) -> Result<Vec<ScenarioResult>, HarnessError> {
        let Some(first) = scenarios.first() else {
            return Ok(Vec::new());
        };

        let outcome = self.execute_scenario(first).await?;
        debug!(
            status = %outcome.status,
            scenarios = scenarios.len(),
            "shared validation outcome applied to all scenarios"
        );

        Ok(scenarios
            .into_iter()
            .map(|scenario| {
                record_outcome(&scenario, &outcome);
                ScenarioResult {
                    scenario,
                    outcome: outcome.clone(),
                }
            })
            .collect())
    }
}

fn record_outcome(scenario: &Scenario, outcome: &Outcome) {
    metrics::counter!(
        m::SCENARIOS_TOTAL,
        m::LABEL_STATUS => outcome.status.as_str(),
        m::LABEL_CATEGORY => scenario.category.as_str()
    )
    .increment(1);
    metrics::histogram!(m::SCENARIO_DURATION_SECONDS).record(outcome.duration.as_secs_f64());

    info!(
        scenario = %scenario.name,
        category = %scenario.category,
        label = %scenario.label,
        status = outcome.status.as_str(),
        duration_ms = u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
        "scenario finished"
    );
}
