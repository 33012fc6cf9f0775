//! Configuration for siteqa.
//!
//! Precedence: CLI flags > `.siteqa/config.toml` > built-in defaults. The
//! defaults reproduce the layout of the portfolio repository, so a project
//! with no config file works out of the box.

mod discovery;
mod model;
mod validation;

pub use discovery::{CONFIG_DIR, CONFIG_FILE};
pub use model::{
    AuditConfig, AuditsConfig, CliArgs, Config, DEFAULT_DEV_PORT, DEFAULT_PORT, ServerConfig,
    SiteConfig, ToolsConfig,
};
pub use siteqa_utils::types::ConfigSource;
