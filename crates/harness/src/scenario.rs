//! Scenario definitions
//!
//! Scenarios are plain data: a name, a category and the axis label that the
//! report groups by. The execution loop in [`runner`](crate::runner) never
//! looks inside them beyond logging and reporting, so the matrix can grow by
//! editing a table (or `[matrix]` in `nodecheck.toml`).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use nodecheck_core::config::MatrixConfig;

use crate::error::HarnessError;

/// Name of the stand-alone structural scenario.
pub const STRUCTURAL_SCENARIO: &str = "StructuralValidation";

/// Prefix of instance-type scenario names.
const INSTANCE_TYPE_PREFIX: &str = "InstanceType_";

/// Axis a scenario belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Single structural well-formedness check of the module
    Structural,
    /// Cluster topology variants (single, HA, production)
    TopologyValidity,
    /// Instance class variants
    InstanceTypeCompatibility,
    /// Bootstrap vs. joining node role
    BootstrapRole,
}

impl Category {
    /// Stable identifier used in logs, metrics and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::TopologyValidity => "topology-validity",
            Self::InstanceTypeCompatibility => "instance-type-compatibility",
            Self::BootstrapRole => "bootstrap-role",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named test case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique within its category
    pub name: String,
    /// Axis
    pub category: Category,
    /// Reported axis value. Recorded for reporting only; it is not passed
    /// to the validation tool.
    pub label: String,
}

impl Scenario {
    /// The stand-alone structural check.
    pub fn structural() -> Self {
        Self {
            name: STRUCTURAL_SCENARIO.to_owned(),
            category: Category::Structural,
            label: "module".to_owned(),
        }
    }

    /// A topology scenario, e.g. `ValidHAControlPlane`.
    pub fn topology(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            category: Category::TopologyValidity,
        }
    }

    /// An instance-type scenario; the name becomes `InstanceType_<label>`.
    pub fn instance_type(instance_type: impl Into<String>) -> Self {
        let label = instance_type.into();
        Self {
            name: format!("{INSTANCE_TYPE_PREFIX}{label}"),
            category: Category::InstanceTypeCompatibility,
            label,
        }
    }

    /// A bootstrap-role scenario, e.g. `JoiningNode`.
    pub fn bootstrap_role(role: impl Into<String>) -> Self {
        let name = role.into();
        Self {
            label: name.clone(),
            name,
            category: Category::BootstrapRole,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Test group a caller can select. Each group is one suite entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestGroup {
    /// Structural validity check
    Structural,
    /// Topology input matrix
    Inputs,
    /// Instance type compatibility
    InstanceTypes,
    /// Bootstrap role check
    Bootstrap,
}

impl TestGroup {
    /// Every group, in reporting order.
    pub const ALL: [TestGroup; 4] = [
        TestGroup::Structural,
        TestGroup::Inputs,
        TestGroup::InstanceTypes,
        TestGroup::Bootstrap,
    ];

    /// Category of the scenarios this group runs.
    pub fn category(&self) -> Category {
        match self {
            Self::Structural => Category::Structural,
            Self::Inputs => Category::TopologyValidity,
            Self::InstanceTypes => Category::InstanceTypeCompatibility,
            Self::Bootstrap => Category::BootstrapRole,
        }
    }
}

/// The declared scenario tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioMatrix {
    /// Topology names
    pub topologies: Vec<String>,
    /// Instance type labels
    pub instance_types: Vec<String>,
    /// Bootstrap role names
    pub bootstrap_roles: Vec<String>,
}

impl Default for ScenarioMatrix {
    fn default() -> Self {
        Self::from_config(&MatrixConfig::default())
    }
}

impl ScenarioMatrix {
    /// Builds the matrix from the `[matrix]` config section.
    pub fn from_config(config: &MatrixConfig) -> Self {
        Self {
            topologies: config.topologies.clone(),
            instance_types: config.instance_types.clone(),
            bootstrap_roles: config.bootstrap_roles.clone(),
        }
    }

    /// Expands the selected groups into scenarios, in group order.
    ///
    /// The result is checked with [`validate_scenarios`] before it is
    /// returned, so a broken table fails here rather than mid-run.
    pub fn scenarios(&self, groups: &[TestGroup]) -> Result<Vec<Scenario>, HarnessError> {
        let mut scenarios = Vec::new();
        for group in TestGroup::ALL.iter().filter(|g| groups.contains(*g)) {
            match group {
                TestGroup::Structural => scenarios.push(Scenario::structural()),
                TestGroup::Inputs => {
                    scenarios.extend(self.topologies.iter().map(Scenario::topology))
                }
                TestGroup::InstanceTypes => {
                    scenarios.extend(self.instance_types.iter().map(Scenario::instance_type))
                }
                TestGroup::Bootstrap => {
                    scenarios.extend(self.bootstrap_roles.iter().map(Scenario::bootstrap_role))
                }
            }
        }
        validate_scenarios(&scenarios)?;
        Ok(scenarios)
    }

    /// Scenario count for the given groups, without validation.
    pub fn len(&self, groups: &[TestGroup]) -> usize {
        TestGroup::ALL
            .iter()
            .filter(|g| groups.contains(*g))
            .map(|g| match g {
                TestGroup::Structural => 1,
                TestGroup::Inputs => self.topologies.len(),
                TestGroup::InstanceTypes => self.instance_types.len(),
                TestGroup::Bootstrap => self.bootstrap_roles.len(),
            })
            .sum()
    }
}

/// Checks suite bookkeeping: non-empty, no blank names, names unique
/// within a category.
pub fn validate_scenarios(scenarios: &[Scenario]) -> Result<(), HarnessError> {
    if scenarios.is_empty() {
        return Err(HarnessError::SuiteDefinition(
            "scenario matrix is empty".to_owned(),
        ));
    }

    let mut seen = HashSet::with_capacity(scenarios.len());
    for scenario in scenarios {
        if scenario.name.trim().is_empty() || scenario.label.trim().is_empty() {
            return Err(HarnessError::SuiteDefinition(format!(
                "scenario in category '{}' has an empty name",
                scenario.category
            )));
        }
        if !seen.insert((scenario.category, scenario.name.as_str())) {
            return Err(HarnessError::SuiteDefinition(format!(
                "duplicate scenario name '{}' in category '{}'",
                scenario.name, scenario.category
            )));
        }
    }
    Ok(())
}
