//! `nodecheck list` command handler

use std::io::Write;

use serde::Serialize;

use nodecheck_core::config::NodecheckConfig;
use nodecheck_harness::{Scenario, ScenarioMatrix, TestGroup};

use crate::cli::{ListArgs, resolve_groups};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `list` command.
///
/// Expands the matrix exactly like `run` does, so a broken table is
/// reported here with the same exit code.
pub fn execute(
    args: ListArgs,
    config: &NodecheckConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let groups = resolve_groups(&args.groups);
    let scenarios = ScenarioMatrix::from_config(&config.matrix).scenarios(&groups)?;

    let report = ListReport {
        groups,
        total: scenarios.len(),
        scenarios,
    };
    writer.render(&report)
}

/// Declared scenarios for the selected groups.
#[derive(Serialize)]
pub struct ListReport {
    pub groups: Vec<TestGroup>,
    pub total: usize,
    pub scenarios: Vec<Scenario>,
}

impl Render for ListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{:<30} {:<32} {}", "Category", "Scenario", "Label")?;
        writeln!(w, "{}", "-".repeat(76))?;
        for scenario in &self.scenarios {
            writeln!(
                w,
                "{:<30} {:<32} {}",
                scenario.category.as_str(),
                scenario.name,
                scenario.label.dimmed()
            )?;
        }
        writeln!(w)?;
        writeln!(w, "Total: {}", self.total.to_string().bold())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(groups: &[TestGroup]) -> ListReport {
        let scenarios = ScenarioMatrix::default()
            .scenarios(groups)
            .expect("default matrix is valid");
        ListReport {
            groups: groups.to_vec(),
            total: scenarios.len(),
            scenarios,
        }
    }

    #[test]
    fn test_list_report_render_text() {
        let report = report(&[TestGroup::InstanceTypes]);

        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");

        assert!(output.contains("InstanceType_t3.medium"));
        assert!(output.contains("InstanceType_m5.xlarge"));
        assert!(output.contains("instance-type-compatibility"));
        assert!(output.contains("Total:"));
    }

    #[test]
    fn test_list_report_json() {
        let report = report(&TestGroup::ALL);
        let json = serde_json::to_value(&report).expect("report should serialize");

        assert_eq!(json["total"], 16);
        assert_eq!(json["scenarios"][0]["name"], "StructuralValidation");
        assert_eq!(json["scenarios"][1]["category"], "topology-validity");
    }
}
