use siteqa_runner::CommandSpec;
use siteqa_utils::error::ConfigError;

use super::model::Config;

impl Config {
    /// Validate configuration values
    ///
    /// Rejects values that would make a run hang or fail before any stage
    /// starts: port 0, a zero-length readiness window, a zero tool timeout,
    /// or a command line that does not split into at least a program name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "0"));
        }

        if self.server.ready_attempts == 0 {
            return Err(invalid("server.ready_attempts", "0"));
        }

        if self.server.ready_interval_ms == 0 {
            return Err(invalid("server.ready_interval_ms", "0"));
        }

        if self.server.probe_timeout_ms == 0 {
            return Err(invalid("server.probe_timeout_ms", "0"));
        }

        if self.server.port_env.trim().is_empty() {
            return Err(invalid("server.port_env", &self.server.port_env));
        }

        if self.tools.timeout_secs == 0 {
            return Err(invalid("tools.timeout_secs", "0"));
        }

        if !self.tools.default_origin.starts_with("http://")
            && !self.tools.default_origin.starts_with("https://")
        {
            return Err(invalid("tools.default_origin", &self.tools.default_origin));
        }

        for (key, line) in [
            ("server.command", &self.server.command),
            ("site.generate_command", &self.site.generate_command),
        ] {
            if CommandSpec::parse(line).is_err() {
                return Err(invalid(key, line));
            }
        }

        for (key, audit) in [
            ("audits.links.config", &self.audits.links),
            ("audits.accessibility.config", &self.audits.accessibility),
            ("audits.performance.config", &self.audits.performance),
        ] {
            if audit.config.as_os_str().is_empty() {
                return Err(invalid(key, ""));
            }
        }

        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
