//! Stop command implementation
//!
//! Handles `siteqa stop`: frees a port by sending SIGTERM to every listener.

use std::time::Duration;

use siteqa_engine::{PortOccupants, evict};
use siteqa_utils::exit_codes::ExitCode;
use siteqa_utils::logging::{MessageLevel, format_message};

/// Result of freeing a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub found: Vec<u32>,
    pub terminated: Vec<u32>,
}

impl StopOutcome {
    /// Success means at least one process accepted the signal.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_passed(!self.terminated.is_empty())
    }
}

/// Signal every process listening on `port`. No settle wait.
pub async fn stop_port(occupants: &dyn PortOccupants, port: u16) -> StopOutcome {
    let eviction = evict(occupants, port, Duration::ZERO).await;

    if !eviction.port_was_busy() {
        println!(
            "{}",
            format_message(MessageLevel::Info, &format!("No process found on port {port}"))
        );
    }
    for pid in &eviction.signalled {
        println!(
            "{}",
            format_message(
                MessageLevel::Success,
                &format!("Terminated process {pid} on port {port}")
            )
        );
    }
    for (pid, reason) in &eviction.failed {
        println!(
            "{}",
            format_message(
                MessageLevel::Error,
                &format!("Could not terminate process {pid}: {reason}")
            )
        );
    }

    StopOutcome {
        found: eviction.found,
        terminated: eviction.signalled,
    }
}

/// Execute the stop command.
pub async fn execute_stop_command(occupants: &dyn PortOccupants, port: u16) -> ExitCode {
    stop_port(occupants, port).await.exit_code()
}
