//! Dependency probe for the external QA tools
//!
//! Checks that each required tool resolves on `PATH` before a run starts, so
//! a missing tool fails fast instead of surfacing mid-run as a spawn error.

pub use siteqa_utils::types::{CheckStatus, DependencyCheck, DependencyReport};

use chrono::Utc;
use std::path::PathBuf;
use tracing::debug;

/// Report schema emitted by `siteqa doctor --json`.
pub const SCHEMA_VERSION: &str = "1";

/// An external tool the run depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredTool {
    /// Executable name looked up on `PATH`
    pub name: &'static str,
    /// What the tool does and how to install it
    pub hint: &'static str,
}

/// Tools probed before a run, in probe order.
pub const REQUIRED_TOOLS: &[RequiredTool] = &[
    RequiredTool {
        name: "jq",
        hint: "JSON processor (brew install jq)",
    },
    RequiredTool {
        name: "lychee",
        hint: "Link checker (brew install lychee or cargo install lychee)",
    },
    RequiredTool {
        name: "pa11y-ci",
        hint: "Accessibility tester (npm install -g pa11y-ci)",
    },
    RequiredTool {
        name: "lhci",
        hint: "Lighthouse CI (npm install -g @lhci/cli)",
    },
];

/// Resolves an executable name to a path.
pub trait ToolLocator: Send + Sync {
    fn locate(&self, tool: &str) -> Option<PathBuf>;
}

/// Looks tools up on the process `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }
}

/// Probe every tool in [`REQUIRED_TOOLS`].
#[must_use]
pub fn probe(locator: &dyn ToolLocator) -> DependencyReport {
    probe_tools(locator, REQUIRED_TOOLS)
}

/// Probe an explicit tool list, preserving its order.
#[must_use]
pub fn probe_tools(locator: &dyn ToolLocator, tools: &[RequiredTool]) -> DependencyReport {
    let checks: Vec<DependencyCheck> = tools
        .iter()
        .map(|tool| match locator.locate(tool.name) {
            Some(path) => {
                debug!(tool = tool.name, path = %path.display(), "Tool found");
                DependencyCheck {
                    tool: tool.name.to_string(),
                    status: CheckStatus::Pass,
                    details: path.display().to_string(),
                }
            }
            None => {
                debug!(tool = tool.name, "Tool not found on PATH");
                DependencyCheck {
                    tool: tool.name.to_string(),
                    status: CheckStatus::Fail,
                    details: tool.hint.to_string(),
                }
            }
        })
        .collect();

    let ok = !checks.iter().any(|c| c.status == CheckStatus::Fail);

    DependencyReport {
        schema_version: SCHEMA_VERSION.to_string(),
        emitted_at: Utc::now(),
        ok,
        checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Reports a fixed set of tools as installed under `/usr/local/bin`.
    struct FixedLocator(HashSet<&'static str>);

    impl FixedLocator {
        fn with(tools: &[&'static str]) -> Self {
            Self(tools.iter().copied().collect())
        }
    }

    impl ToolLocator for FixedLocator {
        fn locate(&self, tool: &str) -> Option<PathBuf> {
            self.0
                .contains(tool)
                .then(|| PathBuf::from("/usr/local/bin").join(tool))
        }
    }

    #[test]
    fn test_required_tools_order() {
        let names: Vec<_> = REQUIRED_TOOLS.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["jq", "lychee", "pa11y-ci", "lhci"]);
    }

    #[test]
    fn test_all_present_is_ok() {
        let report = probe(&FixedLocator::with(&["jq", "lychee", "pa11y-ci", "lhci"]));

        assert!(report.ok);
        assert_eq!(report.checks.len(), 4);
        assert_eq!(report.missing().count(), 0);
        assert_eq!(report.checks[0].details, "/usr/local/bin/jq");
    }

    #[test]
    fn test_missing_tool_reported_with_hint() {
        let report = probe(&FixedLocator::with(&["jq", "lychee", "lhci"]));

        assert!(!report.ok);
        let missing: Vec<_> = report.missing().collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].tool, "pa11y-ci");
        assert_eq!(
            missing[0].details,
            "Accessibility tester (npm install -g pa11y-ci)"
        );
    }

    #[test]
    fn test_report_serializes_snake_case_status() {
        let report = probe(&FixedLocator::with(&[]));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["ok"], false);
        assert_eq!(json["schema_version"], "1");
        assert_eq!(json["checks"][3]["status"], "fail");
    }
}
