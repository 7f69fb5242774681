use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use fleet_cli::commands::{allocate, distribute, normalize, shifts};
use fleet_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match &cli.command {
        Some(Commands::Allocate {
            input,
            json,
            strict,
        }) => {
            allocate::run(input, *json, *strict, &config)?;
        }
        Some(Commands::Shifts { json }) => {
            shifts::run(&config.shifts, *json)?;
        }
        Some(Commands::Normalize { day, start, end }) => {
            normalize::run(day, start, end, &config.normalizer())?;
        }
        Some(Commands::Distribute {
            total,
            precision,
            members,
        }) => {
            distribute::run(*total, precision.unwrap_or(config.precision), members)?;
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
