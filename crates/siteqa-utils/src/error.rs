use std::path::PathBuf;
use thiserror::Error;

pub use siteqa_runner::RunnerError;

/// Library-level error type for siteqa.
///
/// Stage-level failures (a tool exiting non-zero, timing out, or failing to
/// spawn) are *not* errors: they become a failed [`StageResult`] and the run
/// continues. `SiteQaError` covers the cases that stop a run outright, plus
/// the building blocks stages use internally before they fold an error into
/// a result.
///
/// | Category | Exit code |
/// |----------|-----------|
/// | `Config` | 2 |
/// | everything else | 1 |
///
/// An interrupted run is not an error; it is reported through the run report
/// and exits 130.
///
/// [`StageResult`]: crate::types::StageResult
#[derive(Error, Debug)]
pub enum SiteQaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Local server error: {0}")]
    Server(#[from] ServerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required tools: {}", tools.join(", "))]
    MissingDependencies { tools: Vec<String> },
}

impl SiteQaError {
    /// Message with an actionable hint where one exists.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        match self.suggestion() {
            Some(hint) => format!("{self}\n  hint: {hint}"),
            None => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(ConfigError::NotFound { .. }) => {
                Some("create .siteqa/config.toml or pass --config <path>")
            }
            Self::Config(_) => Some("check .siteqa/config.toml against the documented keys"),
            Self::Server(ServerError::NotReady { .. } | ServerError::ExitedEarly { .. }) => {
                Some("another process may still hold the port; try `siteqa stop --port <port>`")
            }
            Self::Server(ServerError::PortInUse { .. }) => {
                Some("stop the listed processes or pick another port with --port")
            }
            Self::MissingDependencies { .. } => {
                Some("install the listed tools or rerun with --skip-deps")
            }
            _ => None,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Invalid configuration file {path}: {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

/// Errors from the local server lifecycle.
///
/// Every variant is fatal to a run: the audit stages need a live server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to start server '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("Server exited before becoming ready ({status})")]
    ExitedEarly { status: String },

    #[error("Server at {url} did not respond after {attempts} attempts")]
    NotReady { url: String, attempts: u32 },

    #[error("Port {port} is still in use after eviction (pids: {})", format_pids(pids))]
    PortInUse { port: u16, pids: Vec<u32> },
}

fn format_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors while deriving a port-specific copy of a tool config.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path} as JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Field '{field}' must be a string or an array of strings")]
    UnexpectedShape { field: String },

    #[error("Failed to write temporary config: {0}")]
    Write(#[source] std::io::Error),
}
