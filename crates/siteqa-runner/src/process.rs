use async_trait::async_trait;
use std::time::Duration;

use crate::error::RunnerError;

use super::CommandSpec;

/// Output from a process execution.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the process exited successfully (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for process execution.
///
/// Implementations MUST use argv-style APIs only (no shell string evaluation).
/// A process that outlives `timeout` is terminated and reported as
/// [`RunnerError::Timeout`]; a non-zero exit is *not* an error and comes back
/// as `Ok` with the exit code set.
///
/// The orchestrator holds a `&dyn ProcessRunner`, which lets tests swap in a
/// scripted runner to simulate tool success, failure and timeout.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, cmd: &CommandSpec, timeout: Duration)
    -> Result<ProcessOutput, RunnerError>;
}
