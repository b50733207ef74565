//! nodecheck -- scenario-matrix validation for a control-plane node module
//!
//! Loads `nodecheck.toml`, initialises logging and hands off to one of the
//! command handlers. Every error ends up as a `CliError` whose exit code is
//! the process exit status.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use nodecheck_core::config::{GeneralConfig, NodecheckConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    match dispatch(cli, &writer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn dispatch(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    match cli.command {
        Commands::Config(args) => {
            // config problems are what this command reports, so log with defaults
            let general = GeneralConfig {
                log_level: "warn".to_owned(),
                ..GeneralConfig::default()
            };
            init_logging(general, cli.log_level.as_deref())?;
            commands::config::execute(args, &cli.config, writer).await
        }
        Commands::Run(args) => {
            let config = NodecheckConfig::load_or_default(&cli.config).await?;
            init_logging(config.general.clone(), cli.log_level.as_deref())?;
            tracing::debug!(config = %cli.config.display(), "configuration loaded");
            // no-op unless a recorder was installed by the embedding process
            nodecheck_core::metrics::describe_all();
            commands::run::execute(args, config, writer).await
        }
        Commands::List(args) => {
            let config = NodecheckConfig::load_or_default(&cli.config).await?;
            init_logging(config.general.clone(), cli.log_level.as_deref())?;
            commands::list::execute(args, &config, writer)
        }
    }
}

fn init_logging(mut general: GeneralConfig, level: Option<&str>) -> Result<(), CliError> {
    if let Some(level) = level {
        general.log_level = level.to_owned();
    }
    logging::init_tracing(&general).map_err(|e| CliError::Command(e.to_string()))
}
