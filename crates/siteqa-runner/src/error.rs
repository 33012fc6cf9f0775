//! Error types for runner module

use thiserror::Error;

/// Errors raised while launching or supervising a child process
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Invalid command line '{command}': {reason}")]
    InvalidCommand { command: String, reason: String },

    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Failed to wait for process: {reason}")]
    WaitFailed { reason: String },

    #[error("Execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Failed to signal process {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },

    #[error("Process signalling is not supported on this platform")]
    Unsupported,
}
