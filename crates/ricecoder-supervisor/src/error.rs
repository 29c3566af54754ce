//! Error types for process supervision

use std::io;
use thiserror::Error;

/// Process supervision errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Status queried before the process was ever started
    #[error("Process not started")]
    NotStarted,

    /// Operation needs a process record but none exists
    #[error("Process not running")]
    NotRunning,

    /// Non-blocking status probe made before completion
    #[error("Process still running")]
    StillRunning,

    /// A previous run on this instance has not completed yet
    #[error("Process already running")]
    AlreadyRunning,

    /// The OS could not create the child process
    #[error("Failed to spawn process: {0}")]
    Spawn(#[source] io::Error),

    /// Signal delivery failed, error from the OS as-is
    #[cfg(unix)]
    #[error(transparent)]
    Signal(#[from] nix::errno::Errno),
}

/// Result type for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;
