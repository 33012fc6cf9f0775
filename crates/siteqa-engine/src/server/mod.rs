//! Local server lifecycle: evict the port, spawn, poll until ready, tear down.
//!
//! Launching and readiness are separate steps so the caller owns the server
//! while it is polled; an interrupt during the poll still reaches teardown.
//!
//! The server itself is opaque: a command line run from the project root
//! with the port in its environment, reachable only over HTTP.

mod evict;
mod readiness;

pub use evict::{Eviction, LsofOccupants, PortOccupants, evict, parse_pids};
pub use readiness::{HttpProbe, ReadinessPolicy, ReadinessProbe, wait_until_ready};

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, info, warn};

use siteqa_config::Config;
use siteqa_runner::{CommandSpec, TermSignal};
use siteqa_utils::error::ServerError;
use siteqa_utils::logging::{MessageLevel, format_message};

/// How a running server went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Exited within the grace period after SIGTERM
    Stopped,
    /// Needed SIGKILL
    ForceKilled,
    /// Was already gone; carries its exit status
    AlreadyExited(String),
}

/// Pause after a successful readiness check before the final liveness check.
///
/// A stale listener can answer the first request while the new child is
/// still failing to bind.
pub const BIND_SETTLE: Duration = Duration::from_millis(200);

/// A spawned server, ready or not.
#[async_trait]
pub trait LiveServer: Send {
    fn pid(&self) -> Option<u32>;

    /// Base URL the audits should target.
    fn url(&self) -> &str;

    /// Exit status if the server has already terminated.
    fn exit_status(&mut self) -> Option<String>;

    /// Graceful termination, `grace` to exit, then force-kill.
    async fn shutdown(self: Box<Self>, grace: Duration) -> ShutdownOutcome;
}

/// Brings up a server for a run.
#[async_trait]
pub trait ServerLauncher: Send + Sync {
    /// Free the port and spawn the server; returns as soon as it is running.
    async fn launch(&self, config: &Config) -> Result<Box<dyn LiveServer>, ServerError>;

    /// Poll `server` until it answers. Returns the attempt that succeeded.
    ///
    /// Never tears the server down; the caller shuts it down on failure.
    async fn wait_ready(
        &self,
        config: &Config,
        server: &mut dyn LiveServer,
    ) -> Result<u32, ServerError>;
}

/// Handle to the spawned server child.
///
/// On Unix the child leads its own process group and every signal goes to
/// the group. Dropping the handle before [`LiveServer::shutdown`] completes
/// SIGKILLs the whole group.
#[derive(Debug)]
pub struct ServerHandle {
    child: Child,
    pid: Option<u32>,
    url: String,
    /// Set once the group has been terminated and the child reaped
    finished: bool,
}

impl ServerHandle {
    /// Spawn the configured server command with the port in its environment.
    pub fn spawn(config: &Config) -> Result<Self, ServerError> {
        let spec = CommandSpec::parse(&config.server.command)
            .map_err(|e| ServerError::SpawnFailed {
                command: config.server.command.clone(),
                reason: e.to_string(),
            })?
            .cwd(&config.root)
            .env(&config.server.port_env, config.server.port.to_string());

        let mut command = spec.to_tokio_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        siteqa_runner::set_own_process_group(&mut command);

        let child = command.spawn().map_err(|e| ServerError::SpawnFailed {
            command: spec.display(),
            reason: e.to_string(),
        })?;
        let pid = child.id();
        info!(pid = ?pid, command = %spec.display(), port = config.server.port, "Started local server");

        Ok(Self {
            child,
            pid,
            url: format!("{}/", config.server_url()),
            finished: false,
        })
    }

    fn try_exit_status(&mut self) -> Option<String> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            Ok(None) => None,
            Err(e) => Some(format!("wait failed: {e}")),
        }
    }

    fn send(&mut self, sig: TermSignal) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                let delivered = siteqa_runner::signal_group(pid, sig)
                    .or_else(|_| siteqa_runner::signal_process(pid, sig));
                match delivered {
                    Ok(()) => return,
                    Err(e) => warn!(pid, error = %e, "Failed to signal local server"),
                }
            }
        }

        #[cfg(not(unix))]
        let _ = sig;

        if let Err(e) = self.child.start_kill() {
            debug!(error = %e, "start_kill on local server failed");
        }
    }

    /// Signal what is left of the group once the leader is gone.
    fn send_group(&self, sig: TermSignal) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                // No members left is the usual case.
                let _ = siteqa_runner::signal_group(pid, sig);
            }
        }

        #[cfg(not(unix))]
        let _ = sig;
    }

    /// SIGKILL the group and reap the child.
    pub async fn force_kill(&mut self) {
        self.send(TermSignal::Force);
        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Local server killed"),
            Ok(Err(e)) => warn!(error = %e, "Failed to reap local server"),
            Err(_) => warn!(pid = ?self.pid, "Local server did not exit after SIGKILL"),
        }
        self.finished = true;
    }

    /// Terminate gracefully, force-kill after `grace`.
    pub async fn terminate(&mut self, grace: Duration) -> ShutdownOutcome {
        if let Some(status) = self.try_exit_status() {
            // Leftover group members are not waited for.
            self.send_group(TermSignal::Force);
            self.finished = true;
            return ShutdownOutcome::AlreadyExited(status);
        }

        self.send(TermSignal::Graceful);
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(%status, "Local server exited after SIGTERM");
                self.send_group(TermSignal::Force);
                self.finished = true;
                ShutdownOutcome::Stopped
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Waiting for local server failed, force-killing");
                self.force_kill().await;
                ShutdownOutcome::ForceKilled
            }
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "Local server ignored SIGTERM, force-killing");
                self.force_kill().await;
                ShutdownOutcome::ForceKilled
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if !self.finished {
            debug!(pid = ?self.pid, "Server handle dropped before shutdown, killing group");
            self.send_group(TermSignal::Force);
        }
    }
}

#[async_trait]
impl LiveServer for ServerHandle {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn exit_status(&mut self) -> Option<String> {
        self.try_exit_status()
    }

    async fn shutdown(self: Box<Self>, grace: Duration) -> ShutdownOutcome {
        let mut handle = *self;
        handle.terminate(grace).await
    }
}

/// Launches the configured server command on the local machine.
pub struct LocalServer<'a> {
    occupants: &'a dyn PortOccupants,
    probe: &'a dyn ReadinessProbe,
}

impl<'a> LocalServer<'a> {
    #[must_use]
    pub fn new(occupants: &'a dyn PortOccupants, probe: &'a dyn ReadinessProbe) -> Self {
        Self { occupants, probe }
    }
}

#[async_trait]
impl ServerLauncher for LocalServer<'_> {
    async fn launch(&self, config: &Config) -> Result<Box<dyn LiveServer>, ServerError> {
        let port = config.server.port;

        let eviction = evict(self.occupants, port, config.server.evict_wait()).await;
        if eviction.port_was_busy() {
            println!(
                "{}",
                format_message(MessageLevel::Warning, &format!("Port {port} is already in use"))
            );
            for pid in &eviction.signalled {
                println!("Killing process {pid}");
            }
            for (pid, reason) in &eviction.failed {
                println!(
                    "{}",
                    format_message(
                        MessageLevel::Warning,
                        &format!("Could not signal process {pid}: {reason}")
                    )
                );
            }

            // A holdout would answer the readiness poll in place of our server.
            match self.occupants.list(port).await {
                Ok(pids) if !pids.is_empty() => {
                    warn!(port, ?pids, "Port still occupied after eviction");
                    return Err(ServerError::PortInUse { port, pids });
                }
                Ok(_) => {}
                Err(e) => warn!(port, error = %e, "Could not re-check port after eviction"),
            }
        }

        let handle = ServerHandle::spawn(config)?;
        Ok(Box::new(handle))
    }

    async fn wait_ready(
        &self,
        config: &Config,
        server: &mut dyn LiveServer,
    ) -> Result<u32, ServerError> {
        println!(
            "{}",
            format_message(MessageLevel::Info, "Waiting for server to start...")
        );

        let policy = ReadinessPolicy {
            attempts: config.server.ready_attempts,
            interval: config.server.ready_interval(),
        };
        let url = server.url().to_string();

        let attempt = wait_until_ready(policy, self.probe, &url, || server.exit_status()).await?;

        // An answer can come from something else on the port; the child must
        // still be running once it has had time to bind.
        tokio::time::sleep(BIND_SETTLE).await;
        if let Some(status) = server.exit_status() {
            warn!(url = %url, %status, "Server answered but its process has exited");
            return Err(ServerError::ExitedEarly { status });
        }

        info!(url = %url, attempt, "Local server ready");
        Ok(attempt)
    }
}
