use siteqa_utils::exit_codes::ExitCode;
use siteqa_utils::logging::{MessageLevel, render_message, render_step};
use siteqa_utils::types::{Stage, StageResult};

/// Ordered stage outcomes for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    results: Vec<StageResult>,
}

impl Summary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: StageResult) {
        self.results.push(result);
    }

    #[must_use]
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    #[must_use]
    pub fn get(&self, stage: Stage) -> Option<StageResult> {
        self.results.iter().copied().find(|r| r.stage() == stage)
    }

    /// AND of every recorded result. An empty summary passes.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(StageResult::passed)
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_passed(self.all_passed())
    }

    /// The summary table: one line per stage, then the verdict.
    #[must_use]
    pub fn render(&self, colored: bool) -> String {
        let mut out = render_step("Quality Gate Summary", colored);
        out.push('\n');

        for result in &self.results {
            let (level, status) = if result.passed() {
                (MessageLevel::Success, "PASS")
            } else {
                (MessageLevel::Error, "FAIL")
            };
            out.push_str(&render_message(
                level,
                &format!("{status} {}", result.name()),
                colored,
            ));
            out.push('\n');
        }

        out.push('\n');
        let verdict = if self.all_passed() {
            render_message(
                MessageLevel::Success,
                "All quality gates passed! Ready for deployment.",
                colored,
            )
        } else {
            render_message(
                MessageLevel::Error,
                "Some quality gates failed. Please fix issues before pushing.",
                colored,
            )
        };
        out.push_str(&verdict);
        out
    }
}
