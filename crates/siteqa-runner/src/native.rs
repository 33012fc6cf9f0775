use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use crate::error::RunnerError;
use crate::signal::{TermSignal, signal_group};

use super::{CommandSpec, ProcessOutput, ProcessRunner};

/// Default pause between SIGTERM and SIGKILL for a timed-out tool.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

const REAP_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// NativeRunner - argv-style execution on the host
// ============================================================================

/// Runs commands directly on the host with a timeout.
///
/// - stdin is closed, stdout and stderr are captured in full
/// - on Unix the child leads its own process group, so a timeout tears down
///   everything the tool spawned: SIGTERM to the group, a short grace
///   period, then SIGKILL
/// - the child is killed if the returned future is dropped (e.g. the run is
///   interrupted mid-stage)
#[derive(Debug, Clone, Copy)]
pub struct NativeRunner {
    kill_grace: Duration,
}

impl Default for NativeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    #[must_use]
    pub const fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    async fn terminate_group(&self, pid: u32) {
        if let Err(e) = signal_group(pid, TermSignal::Graceful) {
            debug!(pid, error = %e, "SIGTERM to process group failed");
            return;
        }
        tokio::time::sleep(self.kill_grace).await;
        // Already gone is the expected outcome here.
        let _ = signal_group(pid, TermSignal::Force);
    }
}

/// Kills the child's process group if the run future is dropped mid-flight.
///
/// `kill_on_drop` only reaches the direct child; tools such as a browser
/// launcher leave grandchildren behind otherwise.
struct GroupGuard {
    pid: Option<u32>,
}

impl GroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    fn disarm(&mut self) {
        self.pid = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if let Some(pid) = self.pid {
            debug!(pid, "Run cancelled, killing process group");
            let _ = signal_group(pid, TermSignal::Force);
        }
    }
}

#[async_trait]
impl ProcessRunner for NativeRunner {
    async fn run(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
    ) -> Result<ProcessOutput, RunnerError> {
        let mut command = cmd.to_tokio_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        crate::signal::set_own_process_group(&mut command);

        debug!(command = %cmd.display(), timeout_secs = timeout.as_secs(), "Spawning process");

        let mut child = command.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: cmd.program_name(),
            reason: e.to_string(),
        })?;
        let pid = child.id();
        let mut group = GroupGuard::new(pid);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let collect = async {
            let (stdout, stderr) = tokio::join!(read_pipe(stdout), read_pipe(stderr));
            child.wait().await.map(|status| (status, stdout, stderr))
        };

        let outcome = tokio::time::timeout(timeout, collect).await;
        let result = match outcome {
            Ok(Ok((status, stdout, stderr))) => {
                Ok(ProcessOutput::new(stdout, stderr, status.code()))
            }
            Ok(Err(e)) => Err(RunnerError::WaitFailed {
                reason: e.to_string(),
            }),
            Err(_) => {
                warn!(
                    command = %cmd.display(),
                    timeout_secs = timeout.as_secs(),
                    "Process timed out, terminating"
                );
                // The child is still owned here, so the group gets its grace
                // period before anything is killed.
                if let Some(pid) = pid {
                    self.terminate_group(pid).await;
                }
                if let Err(e) = child.start_kill() {
                    debug!(error = %e, "Timed-out process already gone");
                }
                if tokio::time::timeout(REAP_TIMEOUT, child.wait()).await.is_err() {
                    warn!(pid = ?pid, "Timed-out process was not reaped");
                }
                Err(RunnerError::Timeout {
                    timeout_seconds: timeout.as_secs(),
                })
            }
        };

        group.disarm();
        result
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut pipe) = pipe else {
        return buf;
    };
    if let Err(e) = pipe.read_to_end(&mut buf).await {
        debug!(error = %e, "Failed to read process output");
    }
    buf
}
