use std::future::Future;
use std::time::Instant;
use tracing::{info, warn};

use siteqa_config::Config;
use siteqa_doctor::ToolLocator;
use siteqa_runner::ProcessRunner;
use siteqa_utils::error::{ServerError, SiteQaError};
use siteqa_utils::exit_codes::ExitCode;
use siteqa_utils::logging::{
    MessageLevel, format_message, format_step, log_dependency_report, log_stage_complete,
    render_message, use_color,
};
use siteqa_utils::types::{Stage, StageResult};

use crate::server::{LiveServer, ServerLauncher, ShutdownOutcome};
use crate::stages::{self, StageContext, stage_header};
use crate::summary::Summary;

/// Per-run switches from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip the dependency probe and assume every tool is installed
    pub skip_deps: bool,
}

/// Everything a finished (or cancelled) run produced.
#[derive(Debug)]
pub struct RunReport {
    pub summary: Summary,
    /// The run was cancelled by the interrupt future
    pub interrupted: bool,
    /// Setup error that stopped the run early
    pub fatal: Option<SiteQaError>,
    /// How the server went away, if one was started
    pub shutdown: Option<ShutdownOutcome>,
}

impl RunReport {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.interrupted {
            ExitCode::INTERRUPTED
        } else if self.fatal.is_some() {
            ExitCode::FAILURE
        } else {
            self.summary.exit_code()
        }
    }
}

/// Banner printed at the start of a run.
#[must_use]
pub fn render_banner(colored: bool) -> String {
    let title = "LOCAL QUALITY ASSURANCE TESTING";
    let rule = "=".repeat(35);
    let body = format!("{title}\n{rule}\nMirroring CI/CD pipeline locally");
    if colored {
        render_message(MessageLevel::Info, &body, true)
    } else {
        body
    }
}

/// Runs the quality gates in order and owns the server for the run.
///
/// Stage order: dependencies, JSON validation, resume generation, local
/// server, links, accessibility, performance. A dependency or server failure
/// stops the run; every other failure is recorded and the run continues. The
/// server, once spawned, is shut down on every path out of [`run`], including
/// a failed readiness poll and an interrupt.
///
/// [`run`]: Orchestrator::run
pub struct Orchestrator<'a> {
    config: &'a Config,
    runner: &'a dyn ProcessRunner,
    locator: &'a dyn ToolLocator,
    launcher: &'a dyn ServerLauncher,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(
        config: &'a Config,
        runner: &'a dyn ProcessRunner,
        locator: &'a dyn ToolLocator,
        launcher: &'a dyn ServerLauncher,
    ) -> Self {
        Self {
            config,
            runner,
            locator,
            launcher,
        }
    }

    /// Run every stage, racing them against `interrupt`.
    ///
    /// When `interrupt` resolves first the in-flight stage is dropped (its
    /// tool is killed), the server is torn down, and the report is marked
    /// interrupted.
    pub async fn run<F>(&self, options: RunOptions, interrupt: F) -> RunReport
    where
        F: Future<Output = ()>,
    {
        println!("{}", render_banner(use_color()));
        info!(
            root = %self.config.root.display(),
            port = self.config.server.port,
            skip_deps = options.skip_deps,
            "Starting quality gate run"
        );

        let mut summary = Summary::new();
        let mut server: Option<Box<dyn LiveServer>> = None;
        let mut fatal = None;

        let interrupted = tokio::select! {
            outcome = self.run_stages(options, &mut summary, &mut server) => {
                fatal = outcome.err();
                false
            }
            () = interrupt => true,
        };

        let shutdown = match server.take() {
            Some(live) => Some(self.teardown(live).await),
            None => None,
        };

        if interrupted {
            warn!("Run interrupted");
            println!(
                "\n{}",
                format_message(MessageLevel::Warning, "Testing interrupted by user")
            );
        } else {
            println!("{}", summary.render(use_color()));
        }

        RunReport {
            summary,
            interrupted,
            fatal,
            shutdown,
        }
    }

    async fn run_stages(
        &self,
        options: RunOptions,
        summary: &mut Summary,
        server: &mut Option<Box<dyn LiveServer>>,
    ) -> Result<(), SiteQaError> {
        if !options.skip_deps {
            let result = self
                .stage(Stage::Dependencies, async {
                    let report = siteqa_doctor::probe(self.locator);
                    log_dependency_report(&report);
                    report
                })
                .await;
            summary.record(StageResult::new(Stage::Dependencies, result.ok));

            if !result.ok {
                println!(
                    "{}",
                    format_message(
                        MessageLevel::Error,
                        "Please install missing dependencies before continuing"
                    )
                );
                return Err(SiteQaError::MissingDependencies {
                    tools: result.missing().map(|c| c.tool.clone()).collect(),
                });
            }
        }

        let ctx = StageContext {
            config: self.config,
            runner: self.runner,
        };

        summary.record(
            self.stage(Stage::JsonValidation, stages::validate_content(ctx))
                .await,
        );
        summary.record(
            self.stage(Stage::ResumeGeneration, stages::generate_artifacts(ctx))
                .await,
        );

        // The server is handed over before polling so teardown owns it even
        // if the run is interrupted mid-poll.
        let launched = self
            .stage(Stage::LocalServer, async {
                let live = server.insert(self.launcher.launch(self.config).await?);
                self.launcher
                    .wait_ready(self.config, &mut **live)
                    .await?;
                Ok::<_, ServerError>(live.url().to_string())
            })
            .await;
        match launched {
            Ok(url) => {
                println!(
                    "{}",
                    format_message(
                        MessageLevel::Success,
                        &format!("Server is running on {url}")
                    )
                );
                summary.record(StageResult::pass(Stage::LocalServer));
            }
            Err(e) => {
                println!(
                    "{}",
                    format_message(MessageLevel::Error, &format!("Server failed to start: {e}"))
                );
                summary.record(StageResult::fail(Stage::LocalServer));
                return Err(e.into());
            }
        }

        summary.record(
            self.stage(Stage::LinkValidation, stages::check_links(ctx))
                .await,
        );
        summary.record(
            self.stage(Stage::Accessibility, stages::check_accessibility(ctx))
                .await,
        );
        summary.record(
            self.stage(Stage::Performance, stages::check_performance(ctx))
                .await,
        );

        Ok(())
    }

    /// Print the stage header, run `work`, and log how long it took.
    async fn stage<T, Fut>(&self, stage: Stage, work: Fut) -> T
    where
        Fut: Future<Output = T>,
        T: StageOutcome,
    {
        println!(
            "{}",
            format_step(&stage_header(stage, self.config.server.port))
        );
        let started = Instant::now();
        let outcome = work.await;
        log_stage_complete(stage, outcome.passed(), started.elapsed());
        outcome
    }

    async fn teardown(&self, live: Box<dyn LiveServer>) -> ShutdownOutcome {
        println!("{}", format_step("Stopping Local Server"));
        let outcome = live.shutdown(self.config.server.shutdown_grace()).await;
        let (level, message) = match &outcome {
            ShutdownOutcome::Stopped => (
                MessageLevel::Success,
                "Server stopped successfully".to_string(),
            ),
            ShutdownOutcome::ForceKilled => {
                (MessageLevel::Warning, "Server force-killed".to_string())
            }
            ShutdownOutcome::AlreadyExited(status) => (
                MessageLevel::Warning,
                format!("Server had already exited ({status})"),
            ),
        };
        println!("{}", format_message(level, &message));
        outcome
    }
}

/// Anything a stage can yield that has a pass/fail reading.
trait StageOutcome {
    fn passed(&self) -> bool;
}

impl StageOutcome for StageResult {
    fn passed(&self) -> bool {
        StageResult::passed(self)
    }
}

impl StageOutcome for siteqa_doctor::DependencyReport {
    fn passed(&self) -> bool {
        self.ok
    }
}

impl<T, E> StageOutcome for Result<T, E> {
    fn passed(&self) -> bool {
        self.is_ok()
    }
}
