//! The non-fatal stages: content validation, resume generation, and the
//! three audits.
//!
//! Every stage folds its own errors into a [`StageResult`]. Nothing here
//! returns early out of a run.

use std::path::Path;
use tracing::{debug, warn};

use siteqa_config::{AuditConfig, Config};
use siteqa_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use siteqa_utils::logging::{MessageLevel, format_message};
use siteqa_utils::types::{Stage, StageResult};

use crate::rewrite::{ACCESSIBILITY_URLS, PERFORMANCE_URLS, derive_config, local_origin};

const JQ: &str = "jq";
const LYCHEE: &str = "lychee";
const PA11Y: &str = "pa11y-ci";
const LHCI: &str = "lhci";

/// File the accessibility tester's JSON report is written to.
pub const ACCESSIBILITY_REPORT: &str = "pa11y-report.json";

/// What a stage needs from the run.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub config: &'a Config,
    pub runner: &'a dyn ProcessRunner,
}

/// Header line printed before a stage starts.
#[must_use]
pub fn stage_header(stage: Stage, port: u16) -> String {
    match stage {
        Stage::Dependencies => "Checking Dependencies".to_string(),
        Stage::JsonValidation => "Validating JSON Configuration".to_string(),
        Stage::ResumeGeneration => "Generating Resume Files".to_string(),
        Stage::LocalServer => format!("Starting Local Server on Port {port}"),
        Stage::LinkValidation => "Checking for Broken Links".to_string(),
        Stage::Accessibility => "Running Accessibility Tests".to_string(),
        Stage::Performance => "Running Lighthouse Performance Tests".to_string(),
    }
}

fn say(level: MessageLevel, message: &str) {
    println!("{}", format_message(level, message));
}

fn echo(text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        println!("{text}");
    }
}

/// One external tool invocation.
struct ToolRun {
    description: &'static str,
    command: CommandSpec,
    /// Non-zero exit still counts as a pass, with a warning
    allow_failure: bool,
    /// Print stdout on success
    echo_stdout: bool,
}

/// Run a tool and report the outcome. Returns the pass flag and, when the
/// process ran to completion, its output.
async fn run_tool(ctx: StageContext<'_>, run: ToolRun) -> (bool, Option<ProcessOutput>) {
    let command = run.command.cwd(&ctx.config.root);
    say(MessageLevel::Info, &format!("Running: {}", command.display()));

    match ctx.runner.run(&command, ctx.config.tools.timeout()).await {
        Ok(output) if output.success() => {
            say(
                MessageLevel::Success,
                &format!("{} completed successfully", run.description),
            );
            if run.echo_stdout {
                echo(&output.stdout_string());
            }
            (true, Some(output))
        }
        Ok(output) if run.allow_failure => {
            say(
                MessageLevel::Warning,
                &format!("{} completed with warnings", run.description),
            );
            echo(&output.stderr_string());
            (true, Some(output))
        }
        Ok(output) => {
            debug!(command = %command.display(), exit_code = ?output.exit_code, "Tool failed");
            say(MessageLevel::Error, &format!("{} failed", run.description));
            echo(&output.stderr_string());
            (false, Some(output))
        }
        Err(RunnerError::Timeout { timeout_seconds }) => {
            say(
                MessageLevel::Error,
                &format!("{} timed out after {timeout_seconds} seconds", run.description),
            );
            (false, None)
        }
        Err(e) => {
            say(
                MessageLevel::Error,
                &format!("{} failed with error: {e}", run.description),
            );
            (false, None)
        }
    }
}

fn ensure_report_dir(config: &Config, audit: &AuditConfig) {
    if let Some(dir) = &audit.report_dir {
        let dir = config.resolve(dir);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(path = %dir.display(), error = %e, "Failed to create report directory");
        }
    }
}

/// Site content JSON exists and parses (`jq empty <path>`).
pub async fn validate_content(ctx: StageContext<'_>) -> StageResult {
    let content = &ctx.config.site.content;
    if !ctx.config.resolve(content).is_file() {
        say(
            MessageLevel::Error,
            &format!("Configuration file not found: {}", content.display()),
        );
        return StageResult::fail(Stage::JsonValidation);
    }

    let (passed, _) = run_tool(
        ctx,
        ToolRun {
            description: "JSON configuration validation",
            command: CommandSpec::new(JQ).arg("empty").arg(content),
            allow_failure: false,
            echo_stdout: true,
        },
    )
    .await;
    StageResult::new(Stage::JsonValidation, passed)
}

/// Run the resume generator.
pub async fn generate_artifacts(ctx: StageContext<'_>) -> StageResult {
    let command = match CommandSpec::parse(&ctx.config.site.generate_command) {
        Ok(command) => command,
        Err(e) => {
            say(MessageLevel::Error, &format!("Resume file generation failed: {e}"));
            return StageResult::fail(Stage::ResumeGeneration);
        }
    };

    let (passed, _) = run_tool(
        ctx,
        ToolRun {
            description: "Resume file generation",
            command,
            allow_failure: false,
            echo_stdout: true,
        },
    )
    .await;
    StageResult::new(Stage::ResumeGeneration, passed)
}

/// Link checker over the project tree.
pub async fn check_links(ctx: StageContext<'_>) -> StageResult {
    let audit = &ctx.config.audits.links;
    ensure_report_dir(ctx.config, audit);

    let (passed, _) = run_tool(
        ctx,
        ToolRun {
            description: "Link validation",
            command: CommandSpec::new(LYCHEE)
                .arg("--config")
                .arg(&audit.config)
                .arg("."),
            allow_failure: audit.allow_failure,
            echo_stdout: true,
        },
    )
    .await;
    StageResult::new(Stage::LinkValidation, passed)
}

/// Accessibility tester against the audit port, JSON report to disk.
pub async fn check_accessibility(ctx: StageContext<'_>) -> StageResult {
    let config = ctx.config;
    let audit = &config.audits.accessibility;

    let derived = match derive_config(
        &config.resolve(&audit.config),
        ACCESSIBILITY_URLS,
        &config.tools.default_origin,
        &local_origin(config.server.port),
    ) {
        Ok(derived) => derived,
        Err(e) => {
            say(MessageLevel::Error, &format!("Accessibility tests failed: {e}"));
            return StageResult::fail(Stage::Accessibility);
        }
    };
    ensure_report_dir(config, audit);

    let (passed, output) = run_tool(
        ctx,
        ToolRun {
            description: "Accessibility tests",
            command: CommandSpec::new(PA11Y)
                .arg("--config")
                .arg(derived.path())
                .args(["--reporter", "json"]),
            allow_failure: audit.allow_failure,
            echo_stdout: false,
        },
    )
    .await;

    if let (Some(dir), Some(output)) = (&audit.report_dir, output) {
        write_report(&config.resolve(dir).join(ACCESSIBILITY_REPORT), &output.stdout);
    }

    StageResult::new(Stage::Accessibility, passed)
}

fn write_report(path: &Path, body: &[u8]) {
    match std::fs::write(path, body) {
        Ok(()) => say(
            MessageLevel::Info,
            &format!("Report written to {}", path.display()),
        ),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write report"),
    }
}

/// Performance auditor against the audit port.
pub async fn check_performance(ctx: StageContext<'_>) -> StageResult {
    let config = ctx.config;
    let audit = &config.audits.performance;

    let derived = match derive_config(
        &config.resolve(&audit.config),
        PERFORMANCE_URLS,
        &config.tools.default_origin,
        &local_origin(config.server.port),
    ) {
        Ok(derived) => derived,
        Err(e) => {
            say(
                MessageLevel::Error,
                &format!("Lighthouse performance tests failed: {e}"),
            );
            return StageResult::fail(Stage::Performance);
        }
    };
    ensure_report_dir(config, audit);

    let mut config_arg = std::ffi::OsString::from("--config=");
    config_arg.push(derived.path());

    let (passed, _) = run_tool(
        ctx,
        ToolRun {
            description: "Lighthouse performance tests",
            command: CommandSpec::new(LHCI).arg("autorun").arg(config_arg),
            allow_failure: audit.allow_failure,
            echo_stdout: true,
        },
    )
    .await;

    StageResult::new(Stage::Performance, passed)
}
