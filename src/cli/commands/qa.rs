//! Run command implementation
//!
//! Handles `siteqa run`: wires the native collaborators into the
//! orchestrator and races it against Ctrl-C.

use anyhow::Result;
use tracing::warn;

use siteqa_config::Config;
use siteqa_doctor::PathLocator;
use siteqa_engine::{HttpProbe, LocalServer, LsofOccupants, Orchestrator, RunOptions};
use siteqa_runner::NativeRunner;
use siteqa_utils::error::SiteQaError;
use siteqa_utils::exit_codes::ExitCode;

/// Resolves on the first Ctrl-C. Never resolves if the handler cannot be installed.
async fn wait_for_interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Execute the run command
pub async fn execute_run_command(config: &Config, options: RunOptions) -> Result<ExitCode> {
    let runner = NativeRunner::new();
    let locator = PathLocator;
    let occupants = LsofOccupants::new(&runner);
    let probe = HttpProbe::new(config.server.probe_timeout()).map_err(|e| {
        SiteQaError::Io(std::io::Error::other(format!(
            "Failed to build HTTP client: {e}"
        )))
    })?;
    let launcher = LocalServer::new(&occupants, &probe);

    let orchestrator = Orchestrator::new(config, &runner, &locator, &launcher);
    let report = orchestrator.run(options, wait_for_interrupt()).await;

    if let Some(fatal) = &report.fatal {
        eprintln!("✗ {}", fatal.display_for_user());
    }

    Ok(report.exit_code())
}
