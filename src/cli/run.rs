//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Initializes diagnostics
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use anyhow::Result;
use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use crate::{CliArgs, Config, ExitCode, SiteQaError};
use siteqa_doctor::PathLocator;
use siteqa_engine::{LsofOccupants, RunOptions};
use siteqa_runner::NativeRunner;
use siteqa_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// Handles ALL output including errors and returns `Err(ExitCode)` for any
/// non-zero outcome. main.rs only maps that to `std::process::exit`.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: could not initialize logging: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::FAILURE);
        }
    };

    let result = rt.block_on(dispatch(cli));

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(err) => {
            if let Some(siteqa_err) = err.downcast_ref::<SiteQaError>() {
                eprintln!("✗ {}", siteqa_err.display_for_user());
                Err(siteqa_err.to_exit_code())
            } else {
                eprintln!("✗ {err:#}");
                Err(ExitCode::FAILURE)
            }
        }
    }
}

/// Map parsed flags onto the configuration layer's inputs.
pub(crate) fn cli_args_from(cli: &Cli) -> CliArgs {
    let (port, tool_timeout_secs) = match &cli.command {
        Commands::Run {
            port, tool_timeout, ..
        } => (*port, *tool_timeout),
        _ => (None, None),
    };

    CliArgs {
        config_path: cli.config.clone(),
        root: cli.root.clone(),
        port,
        tool_timeout_secs,
        verbose: cli.verbose,
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let cli_args = cli_args_from(&cli);
    match cli.command {
        Commands::Run { skip_deps, .. } => {
            let config = Config::discover(&cli_args).map_err(SiteQaError::Config)?;
            commands::execute_run_command(&config, RunOptions { skip_deps }).await
        }
        Commands::Doctor { json } => commands::execute_doctor_command(json, &PathLocator),
        Commands::Stop { port } => {
            let runner = NativeRunner::new();
            let occupants = LsofOccupants::new(&runner);
            Ok(commands::execute_stop_command(&occupants, port).await)
        }
    }
}
