//! `nodecheck run` command handler

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use nodecheck_core::config::NodecheckConfig;
use nodecheck_harness::{
    CategorySummary, RunnerConfig, ScenarioMatrix, ScenarioResult, ScenarioRunner, Status,
    SuiteResult, TargetOptions, TerraformValidator, TestGroup, ToolInfo,
};

use crate::cli::{RunArgs, resolve_groups};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
///
/// Renders the report whenever the suite completes; a failing scenario is
/// reported first and then turned into exit code 1.
pub async fn execute(
    args: RunArgs,
    mut config: NodecheckConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    args.apply_overrides(&mut config.validation);
    config.validate()?;

    let groups = resolve_groups(&args.groups);
    let scenarios = ScenarioMatrix::from_config(&config.matrix).scenarios(&groups)?;

    let options = TargetOptions::from_config(&config.validation)?;
    let runner_config = RunnerConfig::from_config(&config.validation);
    let validator = Arc::new(
        TerraformValidator::new(&config.validation.terraform_bin)
            .with_preflight_timeout(options.command_timeout),
    );

    info!(
        module = %options.module_dir.display(),
        terraform = %config.validation.terraform_bin,
        scenarios = scenarios.len(),
        "starting validation run"
    );

    let runner = ScenarioRunner::new(validator, options, runner_config);
    let suite = runner.run_suite(scenarios).await?;

    let report = RunReport::new(config.validation.module_dir.clone(), groups, suite);
    writer.render(&report)?;

    if !report.suite.passed {
        let not_passed = report.suite.failures().count();
        return Err(CliError::ScenariosFailed(format!(
            "{not_passed} of {} scenarios did not pass",
            report.suite.results.len()
        )));
    }

    Ok(())
}

/// Result of one `nodecheck run`.
#[derive(Serialize)]
pub struct RunReport {
    /// Module under test
    pub module_dir: String,
    /// Groups that ran
    pub groups: Vec<TestGroup>,
    /// Suite outcome
    #[serde(flatten)]
    pub suite: SuiteResult,
}

impl RunReport {
    pub fn new(module_dir: String, groups: Vec<TestGroup>, suite: SuiteResult) -> Self {
        Self {
            module_dir,
            groups,
            suite,
        }
    }
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let tool = self
            .suite
            .tool
            .as_ref()
            .map_or_else(|| "unknown tool".to_owned(), format_tool);
        writeln!(w, "Module: {} ({})", self.module_dir.bold(), tool)?;
        writeln!(w, "Run: {}", self.suite.run_id)?;
        writeln!(w)?;

        for result in &self.suite.results {
            render_result(w, result)?;
        }

        writeln!(w)?;
        writeln!(
            w,
            "{:<30} {:>6} {:>6} {:>6} {:>6}",
            "Category", "Total", "Pass", "Fail", "Error"
        )?;
        writeln!(w, "{}", "-".repeat(58))?;
        for summary in &self.suite.summary {
            render_summary(w, summary)?;
        }
        writeln!(w)?;

        let elapsed = format_duration(self.suite.duration);
        if self.suite.passed {
            writeln!(
                w,
                "Result: {} ({} scenarios, {})",
                "PASSED".green().bold(),
                self.suite.results.len(),
                elapsed
            )?;
        } else {
            writeln!(
                w,
                "Result: {} ({} of {} scenarios did not pass, {})",
                "FAILED".red().bold(),
                self.suite.failures().count(),
                self.suite.results.len(),
                elapsed
            )?;
        }

        Ok(())
    }
}

fn render_result(w: &mut dyn Write, result: &ScenarioResult) -> std::io::Result<()> {
    use colored::Colorize;

    let status = result.outcome.status.to_string();
    let status = match result.outcome.status {
        Status::Pass => status.green().bold(),
        Status::Fail => status.red().bold(),
        Status::Error => status.yellow().bold(),
    };
    writeln!(
        w,
        "  {:<5} {:<60} {:>8}",
        status,
        result.scenario.to_string(),
        format_duration(result.outcome.duration)
    )?;

    if let Some(message) = &result.outcome.message {
        for line in message.lines() {
            writeln!(w, "        {line}")?;
        }
    }
    Ok(())
}

fn render_summary(w: &mut dyn Write, summary: &CategorySummary) -> std::io::Result<()> {
    writeln!(
        w,
        "{:<30} {:>6} {:>6} {:>6} {:>6}",
        summary.category.as_str(),
        summary.total,
        summary.passed,
        summary.failed,
        summary.errored
    )
}

fn format_tool(tool: &ToolInfo) -> String {
    format!("{} {}", tool.name, tool.version)
}

fn format_duration(d: Duration) -> String {
    if d.as_secs() >= 60 {
        format!("{}m{:02}s", d.as_secs() / 60, d.as_secs() % 60)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}
