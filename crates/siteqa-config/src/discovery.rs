use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use siteqa_utils::error::ConfigError;
use siteqa_utils::types::ConfigSource;

use super::model::{AuditConfig, CliArgs, Config};

/// Directory holding the config file, also marks the project root.
pub const CONFIG_DIR: &str = ".siteqa";
pub const CONFIG_FILE: &str = "config.toml";

/// TOML configuration file structure. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    server: Option<TomlServer>,
    site: Option<TomlSite>,
    tools: Option<TomlTools>,
    audits: Option<TomlAudits>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlServer {
    port: Option<u16>,
    command: Option<String>,
    port_env: Option<String>,
    ready_attempts: Option<u32>,
    ready_interval_ms: Option<u64>,
    probe_timeout_ms: Option<u64>,
    shutdown_grace_secs: Option<u64>,
    evict_wait_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSite {
    content: Option<PathBuf>,
    generate_command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTools {
    timeout_secs: Option<u64>,
    default_origin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlAudits {
    links: Option<TomlAudit>,
    accessibility: Option<TomlAudit>,
    performance: Option<TomlAudit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlAudit {
    config: Option<PathBuf>,
    allow_failure: Option<bool>,
    report_dir: Option<PathBuf>,
}

/// Applies `Some` values onto a target and records where they came from.
struct Overlay<'a> {
    config: &'a mut Config,
    source: ConfigSource,
}

impl Overlay<'_> {
    fn set<T>(&mut self, key: &str, slot: impl FnOnce(&mut Config) -> &mut T, value: Option<T>) {
        if let Some(value) = value {
            *slot(self.config) = value;
            self.config
                .source_attribution
                .insert(key.to_string(), self.source.clone());
        }
    }

    fn audit(
        &mut self,
        name: &str,
        slot: fn(&mut Config) -> &mut AuditConfig,
        file: Option<TomlAudit>,
    ) {
        let Some(file) = file else { return };
        self.set(&format!("audits.{name}.config"), |c| &mut slot(c).config, file.config);
        self.set(
            &format!("audits.{name}.allow_failure"),
            |c| &mut slot(c).allow_failure,
            file.allow_failure,
        );
        self.set(
            &format!("audits.{name}.report_dir"),
            |c| &mut slot(c).report_dir,
            file.report_dir.map(Some),
        );
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for discovery when no explicit
    /// path is given.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("cannot read current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    ///
    /// Relative `--config` and `--root` values are taken relative to
    /// `start_dir`; the resulting [`Config::root`] is always absolute.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir =
            std::path::absolute(start_dir).map_err(|e| ConfigError::DiscoveryFailed {
                reason: format!("cannot resolve {}: {e}", start_dir.display()),
            })?;

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                let explicit = anchor(&start_dir, explicit);
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit)
            }
            None => Self::discover_config_file_from(&start_dir),
        };

        // Root precedence: --root > directory holding .siteqa/ > start_dir
        let root = cli_args
            .root
            .as_deref()
            .map(|root| anchor(&start_dir, root))
            .or_else(|| config_path.as_deref().and_then(project_root_of))
            .unwrap_or_else(|| start_dir.clone());

        let mut config = Config::with_defaults(root);

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "Loading config file");
            let file = Self::load_config_file(path)?;
            config.apply_file(file, ConfigSource::ConfigFile(path.clone()));
            config.config_file = Some(path.clone());
        }

        let mut cli = Overlay {
            config: &mut config,
            source: ConfigSource::Cli,
        };
        cli.set("server.port", |c| &mut c.server.port, cli_args.port);
        cli.set(
            "tools.timeout_secs",
            |c| &mut c.tools.timeout_secs,
            cli_args.tool_timeout_secs,
        );

        config.validate()?;
        Ok(config)
    }

    /// Search upward from `start_dir` for `.siteqa/config.toml`.
    ///
    /// Stops at the filesystem root or at a repository root (`.git`).
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if dir.join(".git").exists() {
                break;
            }
            current = dir.parent();
        }

        None
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::InvalidFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn apply_file(&mut self, file: TomlConfig, source: ConfigSource) {
        let mut overlay = Overlay {
            config: self,
            source,
        };

        if let Some(server) = file.server {
            overlay.set("server.port", |c| &mut c.server.port, server.port);
            overlay.set("server.command", |c| &mut c.server.command, server.command);
            overlay.set("server.port_env", |c| &mut c.server.port_env, server.port_env);
            overlay.set(
                "server.ready_attempts",
                |c| &mut c.server.ready_attempts,
                server.ready_attempts,
            );
            overlay.set(
                "server.ready_interval_ms",
                |c| &mut c.server.ready_interval_ms,
                server.ready_interval_ms,
            );
            overlay.set(
                "server.probe_timeout_ms",
                |c| &mut c.server.probe_timeout_ms,
                server.probe_timeout_ms,
            );
            overlay.set(
                "server.shutdown_grace_secs",
                |c| &mut c.server.shutdown_grace_secs,
                server.shutdown_grace_secs,
            );
            overlay.set(
                "server.evict_wait_ms",
                |c| &mut c.server.evict_wait_ms,
                server.evict_wait_ms,
            );
        }

        if let Some(site) = file.site {
            overlay.set("site.content", |c| &mut c.site.content, site.content);
            overlay.set(
                "site.generate_command",
                |c| &mut c.site.generate_command,
                site.generate_command,
            );
        }

        if let Some(tools) = file.tools {
            overlay.set(
                "tools.timeout_secs",
                |c| &mut c.tools.timeout_secs,
                tools.timeout_secs,
            );
            overlay.set(
                "tools.default_origin",
                |c| &mut c.tools.default_origin,
                tools.default_origin,
            );
        }

        if let Some(audits) = file.audits {
            overlay.audit("links", |c| &mut c.audits.links, audits.links);
            overlay.audit(
                "accessibility",
                |c| &mut c.audits.accessibility,
                audits.accessibility,
            );
            overlay.audit(
                "performance",
                |c| &mut c.audits.performance,
                audits.performance,
            );
        }
    }
}

/// `<root>/.siteqa/config.toml` → `<root>`
/// `path` as seen from `base`.
fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn project_root_of(config_path: &Path) -> Option<PathBuf> {
    let dir = config_path.parent()?;
    if dir.file_name()? == CONFIG_DIR {
        dir.parent().map(Path::to_path_buf)
    } else {
        None
    }
}
