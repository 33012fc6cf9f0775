//! Scripted collaborators for exercising a run without real tools.
//!
//! Available to this crate's tests and, with the `test-utils` feature, to
//! downstream integration tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use siteqa_config::Config;
use siteqa_doctor::ToolLocator;
use siteqa_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use siteqa_utils::error::ServerError;

use crate::server::{LiveServer, ServerLauncher, ShutdownOutcome};

/// How a scripted tool behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolScript {
    Exit(i32),
    ExitWithStdout(i32, String),
    Timeout,
    SpawnFailure,
    /// Never returns; for interrupt tests
    Hang,
}

/// A recorded call to [`ScriptedRunner`].
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Contents of the `--config` file at call time, if it existed
    pub config_snapshot: Option<String>,
}

/// [`ProcessRunner`] that answers from a script keyed by program name.
pub struct ScriptedRunner {
    scripts: HashMap<String, ToolScript>,
    default: ToolScript,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Every program exits 0 unless scripted otherwise.
    #[must_use]
    pub fn passing() -> Self {
        Self {
            scripts: HashMap::new(),
            default: ToolScript::Exit(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with(mut self, program: &str, script: ToolScript) -> Self {
        self.scripts.insert(program.to_string(), script);
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.program).collect()
    }
}

fn snapshot_config(cmd: &CommandSpec, args: &[String]) -> Option<String> {
    let path = args.iter().enumerate().find_map(|(i, arg)| {
        if arg == "--config" {
            args.get(i + 1).cloned()
        } else {
            arg.strip_prefix("--config=").map(str::to_string)
        }
    })?;
    let path = match &cmd.cwd {
        Some(cwd) => cwd.join(path),
        None => PathBuf::from(path),
    };
    std::fs::read_to_string(path).ok()
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
    ) -> Result<ProcessOutput, RunnerError> {
        let program = cmd.program_name();
        let args: Vec<String> = cmd
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let invocation = Invocation {
            program: program.clone(),
            config_snapshot: snapshot_config(cmd, &args),
            args,
            cwd: cmd.cwd.clone(),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation);
        }

        match self.scripts.get(&program).unwrap_or(&self.default).clone() {
            ToolScript::Exit(code) => Ok(ProcessOutput::new(
                Vec::new(),
                format!("{program} exited {code}").into_bytes(),
                Some(code),
            )),
            ToolScript::ExitWithStdout(code, stdout) => {
                Ok(ProcessOutput::new(stdout.into_bytes(), Vec::new(), Some(code)))
            }
            ToolScript::Timeout => Err(RunnerError::Timeout {
                timeout_seconds: timeout.as_secs(),
            }),
            ToolScript::SpawnFailure => Err(RunnerError::SpawnFailed {
                program,
                reason: "No such file or directory".to_string(),
            }),
            ToolScript::Hang => std::future::pending().await,
        }
    }
}

/// [`ToolLocator`] with a fixed set of installed tools.
pub struct StaticLocator(HashSet<String>);

impl StaticLocator {
    #[must_use]
    pub fn all() -> Self {
        Self(
            siteqa_doctor::REQUIRED_TOOLS
                .iter()
                .map(|t| t.name.to_string())
                .collect(),
        )
    }

    #[must_use]
    pub fn without(missing: &[&str]) -> Self {
        let mut locator = Self::all();
        for tool in missing {
            locator.0.remove(*tool);
        }
        locator
    }
}

impl ToolLocator for StaticLocator {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        self.0
            .contains(tool)
            .then(|| PathBuf::from("/opt/tools/bin").join(tool))
    }
}

/// How [`FakeLauncher`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeLaunch {
    Ready,
    /// Spawns, then never answers within the attempt bound
    NotReady,
    /// Spawns, then polls forever; for interrupt tests
    Hang,
    /// Fails before anything is spawned
    SpawnFailed,
}

/// [`ServerLauncher`] that counts launches and shutdowns.
///
/// Every server it spawns counts toward [`FakeLauncher::shutdowns`] once shut
/// down, ready or not.
pub struct FakeLauncher {
    outcome: FakeLaunch,
    launches: AtomicUsize,
    shutdowns: Arc<AtomicUsize>,
}

impl FakeLauncher {
    #[must_use]
    pub fn new(outcome: FakeLaunch) -> Self {
        Self {
            outcome,
            launches: AtomicUsize::new(0),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServerLauncher for FakeLauncher {
    async fn launch(&self, config: &Config) -> Result<Box<dyn LiveServer>, ServerError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.outcome == FakeLaunch::SpawnFailed {
            return Err(ServerError::SpawnFailed {
                command: config.server.command.clone(),
                reason: "No such file or directory".to_string(),
            });
        }
        Ok(Box::new(FakeServer {
            url: format!("{}/", config.server_url()),
            shutdowns: Arc::clone(&self.shutdowns),
        }))
    }

    async fn wait_ready(
        &self,
        config: &Config,
        server: &mut dyn LiveServer,
    ) -> Result<u32, ServerError> {
        match self.outcome {
            FakeLaunch::NotReady => Err(ServerError::NotReady {
                url: server.url().to_string(),
                attempts: config.server.ready_attempts,
            }),
            FakeLaunch::Hang => std::future::pending().await,
            FakeLaunch::Ready | FakeLaunch::SpawnFailed => Ok(1),
        }
    }
}

struct FakeServer {
    url: String,
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl LiveServer for FakeServer {
    fn pid(&self) -> Option<u32> {
        None
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn exit_status(&mut self) -> Option<String> {
        None
    }

    async fn shutdown(self: Box<Self>, _grace: Duration) -> ShutdownOutcome {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        ShutdownOutcome::Stopped
    }
}

/// Lay out the files a portfolio checkout provides under `root`.
///
/// # Panics
///
/// Panics if the fixture cannot be written.
pub fn write_site_fixture(root: &Path) {
    let files = [
        (
            "assets/data/site.config.json",
            r#"{"name": "Test Person", "sections": []}"#,
        ),
        ("test/lychee.toml", "max_concurrency = 4\n"),
        (
            "test/pa11yci.json",
            r#"{"defaults": {"standard": "WCAG2AA"}, "urls": ["http://localhost:8000/index.html", "http://localhost:8000/resume.html"]}"#,
        ),
        (
            "test/lighthouserc.json",
            r#"{"ci": {"collect": {"url": ["http://localhost:8000/"], "numberOfRuns": 1}, "assert": {"preset": "lighthouse:recommended"}}}"#,
        ),
    ];

    for (relative, body) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture directory");
        }
        std::fs::write(&path, body).expect("write fixture file");
    }
}
