use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Quality gate stages, in the order a run executes them.
///
/// ```text
/// Dependencies → JSON Validation → Resume Generation → Local Server
///     → Link Validation → Accessibility → Performance
/// ```
///
/// `Dependencies` and `LocalServer` are fatal: when either fails the run
/// stops and no later stage executes. Every other stage is recorded and the
/// run continues.
///
/// # Example
///
/// ```rust
/// use siteqa_utils::types::Stage;
///
/// assert_eq!(Stage::LinkValidation.as_str(), "link_validation");
/// assert_eq!(Stage::LinkValidation.to_string(), "Link Validation");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Required tools resolve on `PATH`.
    Dependencies,
    /// The site content JSON parses.
    JsonValidation,
    /// The resume generator exits cleanly.
    ResumeGeneration,
    /// The local server answers HTTP.
    LocalServer,
    /// The link checker reports no broken links.
    LinkValidation,
    /// The accessibility tester passes.
    Accessibility,
    /// The performance auditor meets its thresholds.
    Performance,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::Dependencies,
        Stage::JsonValidation,
        Stage::ResumeGeneration,
        Stage::LocalServer,
        Stage::LinkValidation,
        Stage::Accessibility,
        Stage::Performance,
    ];

    /// Stable machine-readable identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::Dependencies => "dependencies",
            Stage::JsonValidation => "json_validation",
            Stage::ResumeGeneration => "resume_generation",
            Stage::LocalServer => "local_server",
            Stage::LinkValidation => "link_validation",
            Stage::Accessibility => "accessibility",
            Stage::Performance => "performance",
        }
    }

    /// Name shown in stage headers and the summary table.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Stage::Dependencies => "Dependency Check",
            Stage::JsonValidation => "JSON Validation",
            Stage::ResumeGeneration => "Resume Generation",
            Stage::LocalServer => "Local Server",
            Stage::LinkValidation => "Link Validation",
            Stage::Accessibility => "Accessibility Tests",
            Stage::Performance => "Performance Tests",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Recorded outcome of a single stage.
///
/// Created once when the stage completes and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    stage: Stage,
    passed: bool,
}

impl StageResult {
    #[must_use]
    pub const fn new(stage: Stage, passed: bool) -> Self {
        Self { stage, passed }
    }

    #[must_use]
    pub const fn pass(stage: Stage) -> Self {
        Self::new(stage, true)
    }

    #[must_use]
    pub const fn fail(stage: Stage) -> Self {
        Self::new(stage, false)
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.stage.display_name()
    }

    #[must_use]
    pub const fn passed(&self) -> bool {
        self.passed
    }
}

/// Status of a health check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// Result of probing for one external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyCheck {
    /// Executable name looked up on `PATH`
    pub tool: String,
    pub status: CheckStatus,
    /// Resolved location when found, install hint otherwise
    pub details: String,
}

/// Output of a dependency probe, suitable for `--json` emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyReport {
    /// Schema version for this report format
    pub schema_version: String,
    /// RFC3339 UTC timestamp when the report was produced
    pub emitted_at: DateTime<Utc>,
    /// True when no check failed
    pub ok: bool,
    /// Checks in probe order
    pub checks: Vec<DependencyCheck>,
}

impl DependencyReport {
    /// Checks that failed, in probe order.
    pub fn missing(&self) -> impl Iterator<Item = &DependencyCheck> {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
    }
}

/// Source of a configuration value.
///
/// Indicates where a configuration value originated from in the precedence chain:
/// CLI arguments > config file > built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Cli,
    ConfigFile(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Cli => write!(f, "cli"),
            ConfigSource::ConfigFile(path) => write!(f, "config ({})", path.display()),
            ConfigSource::Defaults => write!(f, "defaults"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_run_sequence() {
        let names: Vec<_> = Stage::ALL.iter().map(Stage::as_str).collect();
        assert_eq!(
            names,
            vec![
                "dependencies",
                "json_validation",
                "resume_generation",
                "local_server",
                "link_validation",
                "accessibility",
                "performance",
            ]
        );
    }

    #[test]
    fn test_stage_result_accessors() {
        let result = StageResult::fail(Stage::LinkValidation);
        assert_eq!(result.stage(), Stage::LinkValidation);
        assert_eq!(result.name(), "Link Validation");
        assert!(!result.passed());
        assert!(StageResult::pass(Stage::Performance).passed());
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::ResumeGeneration).unwrap();
        assert_eq!(json, r#""resume_generation""#);

        let json = serde_json::to_string(&CheckStatus::Fail).unwrap();
        assert_eq!(json, r#""fail""#);
    }

    #[test]
    fn test_dependency_report_missing_filters_failures() {
        let report = DependencyReport {
            schema_version: "1".to_string(),
            emitted_at: Utc::now(),
            ok: false,
            checks: vec![
                DependencyCheck {
                    tool: "jq".to_string(),
                    status: CheckStatus::Pass,
                    details: "/usr/bin/jq".to_string(),
                },
                DependencyCheck {
                    tool: "lhci".to_string(),
                    status: CheckStatus::Fail,
                    details: "npm install -g @lhci/cli".to_string(),
                },
            ],
        };

        let missing: Vec<_> = report.missing().map(|c| c.tool.as_str()).collect();
        assert_eq!(missing, vec!["lhci"]);
    }
}
