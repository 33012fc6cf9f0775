//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and the subcommand enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use siteqa_config::DEFAULT_DEV_PORT;

/// siteqa - local quality gates for a static portfolio site
#[derive(Parser, Debug)]
#[command(name = "siteqa")]
#[command(about = "Run the portfolio site's CI quality gates locally")]
#[command(long_about = r#"
siteqa mirrors the CI/CD quality pipeline on a developer machine. It validates
the site content, regenerates resume files, serves the site locally, and runs
link, accessibility, and performance audits against it.

EXAMPLES:
  # Full run on the default audit port
  siteqa run

  # Tools already installed, audit port 8100
  siteqa run --skip-deps --port 8100

  # Check which external tools are available
  siteqa doctor
  siteqa doctor --json

  # Stop whatever is serving on the development port
  siteqa stop

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .siteqa/config.toml
  Use --config to specify an explicit config file path

EXIT CODES:
  0    every quality gate passed
  1    a quality gate failed, or setup stopped the run
  2    invalid arguments or configuration
  130  interrupted
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the directory holding .siteqa/, else CWD)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Enable verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run every quality gate against a locally served copy of the site
    Run {
        /// Skip the dependency check and assume every tool is installed
        #[arg(long)]
        skip_deps: bool,

        /// Port for the audit server (default 8001)
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,

        /// Per-tool timeout in seconds
        #[arg(long, value_name = "SECONDS")]
        tool_timeout: Option<u64>,
    },

    /// Check that the external audit tools are installed
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Terminate every process listening on a port
    Stop {
        /// Port to free
        #[arg(long, default_value_t = DEFAULT_DEV_PORT)]
        port: u16,
    },
}

/// Build the CLI command for testing and introspection.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
