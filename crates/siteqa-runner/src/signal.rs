//! Termination signals for processes the runner does not own a handle to
//! (evicting a port occupant) and for whole process groups.

use crate::error::RunnerError;

/// Which termination to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSignal {
    /// SIGTERM: ask the process to exit
    Graceful,
    /// SIGKILL: cannot be caught
    Force,
}

#[cfg(unix)]
impl From<TermSignal> for nix::sys::signal::Signal {
    fn from(sig: TermSignal) -> Self {
        match sig {
            TermSignal::Graceful => nix::sys::signal::Signal::SIGTERM,
            TermSignal::Force => nix::sys::signal::Signal::SIGKILL,
        }
    }
}

/// Send `sig` to a single process.
pub fn signal_process(pid: u32, sig: TermSignal) -> Result<(), RunnerError> {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let raw = to_raw_pid(pid)?;
        kill(Pid::from_raw(raw), nix::sys::signal::Signal::from(sig)).map_err(|e| {
            RunnerError::SignalFailed {
                pid,
                reason: e.to_string(),
            }
        })
    }

    #[cfg(not(unix))]
    {
        let _ = (pid, sig);
        Err(RunnerError::Unsupported)
    }
}

/// Send `sig` to every process in the group led by `pgid`.
///
/// Children spawned by [`NativeRunner`](crate::NativeRunner) lead their own
/// group, so this reaches grandchildren (e.g. a Node tool's workers) too.
pub fn signal_group(pgid: u32, sig: TermSignal) -> Result<(), RunnerError> {
    #[cfg(unix)]
    {
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        let raw = to_raw_pid(pgid)?;
        killpg(Pid::from_raw(raw), nix::sys::signal::Signal::from(sig)).map_err(|e| {
            RunnerError::SignalFailed {
                pid: pgid,
                reason: e.to_string(),
            }
        })
    }

    #[cfg(not(unix))]
    {
        let _ = (pgid, sig);
        Err(RunnerError::Unsupported)
    }
}

/// Put the spawned child in its own process group.
///
/// The child's PID then doubles as its group id for [`signal_group`].
#[cfg(unix)]
pub fn set_own_process_group(cmd: &mut tokio::process::Command) {
    // SAFETY: setpgid is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(|| {
            libc::setpgid(0, 0);
            Ok(())
        });
    }
}

#[cfg(unix)]
fn to_raw_pid(pid: u32) -> Result<i32, RunnerError> {
    // 0 and negative values address groups or every process; never allow them here.
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(raw),
        _ => Err(RunnerError::SignalFailed {
            pid,
            reason: "invalid pid".to_string(),
        }),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_pid_zero() {
        assert!(matches!(
            signal_process(0, TermSignal::Graceful),
            Err(RunnerError::SignalFailed { pid: 0, .. })
        ));
        assert!(matches!(
            signal_group(u32::MAX, TermSignal::Force),
            Err(RunnerError::SignalFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_graceful_signal_stops_sleep() {
        let mut child = tokio::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("spawn sleep");
        let pid = child.id().expect("child pid");

        signal_process(pid, TermSignal::Graceful).unwrap();
        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }
}
