use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use siteqa_utils::types::ConfigSource;

/// Port the audit server listens on unless overridden.
pub const DEFAULT_PORT: u16 = 8001;

/// Port the plain development server uses, and the one tool configs reference.
pub const DEFAULT_DEV_PORT: u16 = 8000;

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file (skips discovery)
    pub config_path: Option<PathBuf>,
    /// Explicit project root
    pub root: Option<PathBuf>,
    pub port: Option<u16>,
    pub tool_timeout_secs: Option<u64>,
    pub verbose: bool,
}

/// Local server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    /// Port the audit server binds
    pub port: u16,
    /// Command line that starts the static file server
    pub command: String,
    /// Environment variable carrying the port to the server process
    pub port_env: String,
    /// Readiness probes before giving up
    pub ready_attempts: u32,
    pub ready_interval_ms: u64,
    /// Timeout of a single readiness probe
    pub probe_timeout_ms: u64,
    /// Grace period between SIGTERM and SIGKILL at teardown
    pub shutdown_grace_secs: u64,
    /// Pause after signalling a previous port occupant
    pub evict_wait_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            command: "python3 _scripts/serve.py".to_string(),
            port_env: "PORT".to_string(),
            ready_attempts: 30,
            ready_interval_ms: 1_000,
            probe_timeout_ms: 2_000,
            shutdown_grace_secs: 5,
            evict_wait_ms: 1_000,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn ready_interval(&self) -> Duration {
        Duration::from_millis(self.ready_interval_ms)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    #[must_use]
    pub fn evict_wait(&self) -> Duration {
        Duration::from_millis(self.evict_wait_ms)
    }
}

/// Site content and the resume generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteConfig {
    /// Site content JSON checked by the validation stage
    pub content: PathBuf,
    /// Command line that regenerates the resume documents
    pub generate_command: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content: PathBuf::from("assets/data/site.config.json"),
            generate_command: "python3 _scripts/create_resume.py".to_string(),
        }
    }
}

/// Settings shared by every external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolsConfig {
    /// Upper bound for a single tool run
    pub timeout_secs: u64,
    /// Origin hard-coded in the tool configs, replaced with the audit port
    pub default_origin: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            default_origin: format!("http://localhost:{DEFAULT_DEV_PORT}"),
        }
    }
}

impl ToolsConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One audit tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditConfig {
    /// Tool configuration file, relative to the project root
    pub config: PathBuf,
    /// Record a non-zero exit as a pass with a warning
    pub allow_failure: bool,
    /// Directory the tool writes reports into, created before the run
    pub report_dir: Option<PathBuf>,
}

impl AuditConfig {
    fn new(config: &str, report_dir: Option<&str>) -> Self {
        Self {
            config: PathBuf::from(config),
            allow_failure: false,
            report_dir: report_dir.map(PathBuf::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditsConfig {
    pub links: AuditConfig,
    pub accessibility: AuditConfig,
    pub performance: AuditConfig,
}

impl Default for AuditsConfig {
    fn default() -> Self {
        Self {
            links: AuditConfig::new("test/lychee.toml", Some(".lycheeci")),
            accessibility: AuditConfig::new("test/pa11yci.json", Some(".pa11yci")),
            performance: AuditConfig::new("test/lighthouserc.json", None),
        }
    }
}

/// Effective configuration for a run.
///
/// Relative paths are resolved against [`Config::root`] with
/// [`Config::resolve`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root: every command runs here
    pub root: PathBuf,
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub tools: ToolsConfig,
    pub audits: AuditsConfig,
    /// Config file that was loaded, if any
    pub config_file: Option<PathBuf>,
    /// Where each overridable value came from
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Config {
    /// Built-in defaults rooted at `root`, without touching the filesystem.
    #[must_use]
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            server: ServerConfig::default(),
            site: SiteConfig::default(),
            tools: ToolsConfig::default(),
            audits: AuditsConfig::default(),
            config_file: None,
            source_attribution: HashMap::new(),
        }
    }

    /// Resolve a configured path against the project root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Where `key` came from; unset keys are defaults.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Defaults)
    }

    /// Base URL of the audit server.
    #[must_use]
    pub fn server_url(&self) -> String {
        format!("http://localhost:{}", self.server.port)
    }
}
