use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use siteqa_runner::{CommandSpec, ProcessRunner, RunnerError, TermSignal, signal_process};

/// Finds and signals processes bound to a TCP port.
#[async_trait]
pub trait PortOccupants: Send + Sync {
    /// PIDs currently listening on `port`. Empty when the port is free.
    async fn list(&self, port: u16) -> Result<Vec<u32>, RunnerError>;

    /// Ask `pid` to exit.
    fn terminate(&self, pid: u32) -> Result<(), RunnerError>;
}

/// Port lookup via `lsof -ti:<port>`, termination via SIGTERM.
pub struct LsofOccupants<'a> {
    runner: &'a dyn ProcessRunner,
    timeout: Duration,
}

impl<'a> LsofOccupants<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self {
            runner,
            timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl PortOccupants for LsofOccupants<'_> {
    async fn list(&self, port: u16) -> Result<Vec<u32>, RunnerError> {
        let cmd = CommandSpec::new("lsof").arg(format!("-ti:{port}"));
        let output = self.runner.run(&cmd, self.timeout).await?;

        // lsof exits 1 with no output when nothing matches.
        if !output.success() {
            debug!(port, exit_code = ?output.exit_code, "lsof found no listeners");
            return Ok(Vec::new());
        }

        Ok(parse_pids(&output.stdout_string()))
    }

    fn terminate(&self, pid: u32) -> Result<(), RunnerError> {
        signal_process(pid, TermSignal::Graceful)
    }
}

/// One PID per line; blank and malformed lines are skipped.
#[must_use]
pub fn parse_pids(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match line.parse::<u32>() {
            Ok(pid) if pid > 0 => Some(pid),
            _ => {
                debug!(line, "Ignoring unparseable lsof line");
                None
            }
        })
        .collect()
}

/// What an eviction attempt did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Eviction {
    /// Every PID found on the port
    pub found: Vec<u32>,
    /// PIDs that accepted the termination signal
    pub signalled: Vec<u32>,
    /// PIDs that could not be signalled, with the reason
    pub failed: Vec<(u32, String)>,
}

impl Eviction {
    #[must_use]
    pub fn port_was_busy(&self) -> bool {
        !self.found.is_empty()
    }
}

/// Best-effort reclaim of `port`.
///
/// Signals every occupant once, then waits `settle` if any signal landed.
/// There is no check that the port actually became free: another process may
/// bind it in between, or an occupant may ignore SIGTERM. A server that then
/// fails to bind is caught by the readiness poll.
pub async fn evict(occupants: &dyn PortOccupants, port: u16, settle: Duration) -> Eviction {
    let found = match occupants.list(port).await {
        Ok(pids) => pids,
        Err(e) => {
            warn!(port, error = %e, "Could not list processes on port, skipping eviction");
            return Eviction::default();
        }
    };

    let mut eviction = Eviction {
        found: found.clone(),
        ..Eviction::default()
    };

    for pid in found {
        match occupants.terminate(pid) {
            Ok(()) => {
                info!(port, pid, "Sent SIGTERM to port occupant");
                eviction.signalled.push(pid);
            }
            Err(e) => {
                warn!(port, pid, error = %e, "Failed to signal port occupant");
                eviction.failed.push((pid, e.to_string()));
            }
        }
    }

    if !eviction.signalled.is_empty() {
        tokio::time::sleep(settle).await;
    }

    eviction
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedOccupants {
        pids: Result<Vec<u32>, ()>,
        refuse: Vec<u32>,
        terminated: Mutex<Vec<u32>>,
    }

    impl ScriptedOccupants {
        fn new(pids: Vec<u32>) -> Self {
            Self {
                pids: Ok(pids),
                refuse: Vec::new(),
                terminated: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PortOccupants for ScriptedOccupants {
        async fn list(&self, _port: u16) -> Result<Vec<u32>, RunnerError> {
            self.pids.clone().map_err(|()| RunnerError::SpawnFailed {
                program: "lsof".to_string(),
                reason: "not found".to_string(),
            })
        }

        fn terminate(&self, pid: u32) -> Result<(), RunnerError> {
            if self.refuse.contains(&pid) {
                return Err(RunnerError::SignalFailed {
                    pid,
                    reason: "EPERM".to_string(),
                });
            }
            self.terminated.lock().unwrap().push(pid);
            Ok(())
        }
    }

    #[test]
    fn test_parse_pids() {
        assert_eq!(parse_pids("123\n456\n"), vec![123, 456]);
        assert_eq!(parse_pids("  789  \n\nnope\n0\n"), vec![789]);
        assert!(parse_pids("").is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_parse_pids_recovers_listed_pids(
            pids in proptest::collection::vec(1u32..=4_194_304, 0..8),
            pad in "[ \t]{0,3}",
        ) {
            let stdout: String = pids.iter().map(|pid| format!("{pad}{pid}{pad}\n")).collect();
            proptest::prop_assert_eq!(parse_pids(&stdout), pids);
        }
    }

    #[tokio::test]
    async fn test_free_port_signals_nothing() {
        let occupants = ScriptedOccupants::new(Vec::new());
        let eviction = evict(&occupants, 8001, Duration::from_secs(60)).await;

        assert!(!eviction.port_was_busy());
        assert!(occupants.terminated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_busy_port_signals_each_pid() {
        let mut occupants = ScriptedOccupants::new(vec![11, 22, 33]);
        occupants.refuse = vec![22];

        let eviction = evict(&occupants, 8001, Duration::from_millis(10)).await;

        assert_eq!(eviction.found, vec![11, 22, 33]);
        assert_eq!(eviction.signalled, vec![11, 33]);
        assert_eq!(eviction.failed.len(), 1);
        assert_eq!(eviction.failed[0].0, 22);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_fatal() {
        let occupants = ScriptedOccupants {
            pids: Err(()),
            refuse: Vec::new(),
            terminated: Mutex::new(Vec::new()),
        };

        let eviction = evict(&occupants, 8001, Duration::from_secs(60)).await;
        assert_eq!(eviction, Eviction::default());
    }
}
