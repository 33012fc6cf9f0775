//! Logging and console output for siteqa
//!
//! Two channels:
//! - `tracing` for diagnostics (commands, PIDs, poll attempts, timings),
//!   filtered by `SITEQA_LOG` / `RUST_LOG`.
//! - plain stdout lines for the user-facing stage report, styled by
//!   [`format_message`] and [`format_step`].

use crossterm::style::{Attribute, Color, Stylize};
use std::io::IsTerminal;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::types::{CheckStatus, DependencyReport, Stage};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "SITEQA_LOG";

/// Check if colored output should be used.
///
/// Returns true only if stdout is a terminal and `NO_COLOR` is not set.
#[must_use]
pub fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// Logs go to stderr so they never interleave with the stage report on
/// stdout. Calling this twice returns an error instead of panicking.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("siteqa=debug,siteqa_engine=debug,siteqa_runner=debug,warn")
            } else {
                EnvFilter::try_new("warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_thread_ids(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Semantic level of a console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageLevel {
    const fn symbol(self) -> &'static str {
        match self {
            MessageLevel::Info => "→",
            MessageLevel::Success => "✓",
            MessageLevel::Warning => "⚠",
            MessageLevel::Error => "✗",
        }
    }

    const fn color(self) -> Color {
        match self {
            MessageLevel::Info => Color::Cyan,
            MessageLevel::Success => Color::Green,
            MessageLevel::Warning => Color::Yellow,
            MessageLevel::Error => Color::Red,
        }
    }
}

/// Render a message for the given level, optionally with ANSI colour.
///
/// Pure: the same inputs always produce the same string.
///
/// ```rust
/// use siteqa_utils::logging::{render_message, MessageLevel};
///
/// assert_eq!(render_message(MessageLevel::Error, "boom", false), "✗ boom");
/// ```
#[must_use]
pub fn render_message(level: MessageLevel, message: &str, colored: bool) -> String {
    let line = format!("{} {message}", level.symbol());
    if colored {
        format!("{}", line.with(level.color()))
    } else {
        line
    }
}

/// Render a message, colouring it when stdout is an interactive terminal.
#[must_use]
pub fn format_message(level: MessageLevel, message: &str) -> String {
    render_message(level, message, use_color())
}

/// Render a stage header: bold title followed by an underline rule.
#[must_use]
pub fn render_step(title: &str, colored: bool) -> String {
    let rule = "=".repeat(title.chars().count() + 2);
    if colored {
        format!(
            "\n{}\n{rule}",
            title.with(Color::Blue).attribute(Attribute::Bold)
        )
    } else {
        format!("\n{title}\n{rule}")
    }
}

#[must_use]
pub fn format_step(title: &str) -> String {
    render_step(title, use_color())
}

/// Log a stage completion with its duration.
pub fn log_stage_complete(stage: Stage, passed: bool, elapsed: Duration) {
    info!(
        stage = %stage.as_str(),
        passed,
        duration_ms = %elapsed.as_millis(),
        "Stage completed"
    );
}

/// Print a dependency probe report to stdout.
pub fn log_dependency_report(report: &DependencyReport) {
    for check in &report.checks {
        let (level, line) = match check.status {
            CheckStatus::Pass => (
                MessageLevel::Success,
                format!("{} is installed ({})", check.tool, check.details),
            ),
            CheckStatus::Fail => (
                MessageLevel::Error,
                format!("{} is missing: {}", check.tool, check.details),
            ),
        };
        println!("{}", format_message(level, &line));
    }

    if report.ok {
        println!(
            "{}",
            format_message(MessageLevel::Success, "All dependencies are installed")
        );
    } else {
        println!(
            "{}",
            format_message(MessageLevel::Error, "Missing required tools:")
        );
        for check in report.missing() {
            println!("  • {}: {}", check.tool, check.details);
        }
    }
}
