//! Exit status decoding
//!
//! Folds the result of waiting on a child into one shell-style exit code:
//! signal deaths map to `128 + signal`, normal exits to their status byte.

use std::io;
use std::process::ExitStatus;

/// Offset added to the signal number of a process killed by a signal
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Code reported when the wait result cannot be decoded
pub const GENERIC_FAILURE: i32 = 1;

/// How a waited-on child ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Normal termination, including an explicit `exit N`
    Exited(i32),
    /// Killed by the given signal number
    Signaled(i32),
    /// Wait failed or the status carried neither a code nor a signal
    Failed,
}

impl WaitOutcome {
    /// Classify the result of an OS wait call
    pub fn from_wait_result(result: io::Result<ExitStatus>) -> Self {
        match result {
            Ok(status) => Self::from_status(status),
            Err(_) => Self::Failed,
        }
    }

    /// Classify a completed exit status
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signaled(signal);
            }
        }

        Self::Failed
    }
}

/// Convert a wait outcome into a single exit code
pub fn decode(outcome: WaitOutcome) -> i32 {
    match outcome {
        WaitOutcome::Signaled(signal) => SIGNAL_EXIT_BASE + signal,
        // Exit statuses are one byte wide
        WaitOutcome::Exited(code) => code & 0xff,
        WaitOutcome::Failed => GENERIC_FAILURE,
    }
}
