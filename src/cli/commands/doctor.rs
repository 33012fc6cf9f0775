//! Doctor command implementation
//!
//! Handles `siteqa doctor` command for tool availability checks.

use anyhow::{Context, Result};

use siteqa_doctor::{ToolLocator, probe};
use siteqa_utils::exit_codes::ExitCode;
use siteqa_utils::logging::log_dependency_report;

/// Execute the doctor command
pub fn execute_doctor_command(json: bool, locator: &dyn ToolLocator) -> Result<ExitCode> {
    let report = probe(locator);

    if json {
        let json_output =
            serde_json::to_string_pretty(&report).context("Failed to emit doctor JSON")?;
        println!("{json_output}");
    } else {
        log_dependency_report(&report);
        if !report.ok {
            println!();
            println!("Some tools are missing. Install them before running `siteqa run`.");
        }
    }

    Ok(ExitCode::from_passed(report.ok))
}
