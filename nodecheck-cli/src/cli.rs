//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use nodecheck_core::config::ValidationConfig;
use nodecheck_harness::TestGroup;

/// nodecheck -- validate a control-plane node module across a scenario matrix.
///
/// Use `nodecheck <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "nodecheck", version, about, long_about = None)]
pub struct Cli {
    /// Path to the nodecheck.toml configuration file.
    #[arg(short, long, default_value = "nodecheck.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run test groups against the module.
    Run(RunArgs),

    /// List the scenarios a run would execute.
    List(ListArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

/// Selectable test groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupArg {
    /// Structural validity of the module
    Structural,
    /// Topology input matrix
    Inputs,
    /// Instance type compatibility
    InstanceTypes,
    /// Bootstrap vs. joining node
    Bootstrap,
    /// Every group
    All,
}

/// Expands `--group` values into harness groups, defaulting to all.
pub fn resolve_groups(args: &[GroupArg]) -> Vec<TestGroup> {
    if args.is_empty() || args.contains(&GroupArg::All) {
        return TestGroup::ALL.to_vec();
    }
    TestGroup::ALL
        .into_iter()
        .filter(|group| {
            args.iter().any(|arg| match arg {
                GroupArg::Structural => *group == TestGroup::Structural,
                GroupArg::Inputs => *group == TestGroup::Inputs,
                GroupArg::InstanceTypes => *group == TestGroup::InstanceTypes,
                GroupArg::Bootstrap => *group == TestGroup::Bootstrap,
                GroupArg::All => true,
            })
        })
        .collect()
}

// ---- run ----

/// Run test groups against the module.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Test group to run (repeatable, default: all).
    #[arg(short, long = "group", value_enum)]
    pub groups: Vec<GroupArg>,

    /// Override the module directory.
    #[arg(short, long)]
    pub module_dir: Option<PathBuf>,

    /// Override the terraform binary.
    #[arg(long)]
    pub terraform_bin: Option<PathBuf>,

    /// Override the number of scenarios run in parallel.
    #[arg(short = 'j', long)]
    pub parallel: Option<usize>,

    /// Validate once and report the verdict for every scenario.
    #[arg(long)]
    pub reuse_validation: bool,
}

impl RunArgs {
    /// Applies command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut ValidationConfig) {
        if let Some(dir) = &self.module_dir {
            config.module_dir = dir.display().to_string();
        }
        if let Some(bin) = &self.terraform_bin {
            config.terraform_bin = bin.display().to_string();
        }
        if let Some(parallel) = self.parallel {
            config.max_parallel = parallel;
        }
        if self.reuse_validation {
            config.reuse_validation = true;
        }
    }
}

// ---- list ----

/// List the scenarios a run would execute.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Test group to list (repeatable, default: all).
    #[arg(short, long = "group", value_enum)]
    pub groups: Vec<GroupArg>,
}

// ---- config ----

/// Manage nodecheck configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, validation, matrix).
        #[arg(long)]
        section: Option<String>,
    },
}
