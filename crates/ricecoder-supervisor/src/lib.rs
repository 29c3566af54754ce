//! # ricecoder-supervisor
//!
//! **Purpose**: Lifecycle supervision of a single shell command for RiceCoder
//!
//! Launches a command through `/bin/bash -c`, tracks whether it is running,
//! folds its termination into one exit code and lets any number of callers
//! observe completion without re-running the child.
//!
//! ## Features
//!
//! - **Single Reaper**: One background task per run waits on the child
//! - **Broadcast Completion**: Every waiter, early or late, sees the same result
//! - **Shell Exit Codes**: Signal deaths map to `128 + signal`
//! - **Reusable Instances**: Sequential runs on one supervisor, each with fresh state
//! - **Signal Delivery**: Send any Unix signal to the running child
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ricecoder_supervisor::{Process, Signal};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let process = Process::new("sleep 10");
//! process.start()?;
//!
//! // Stop it early
//! process.signal(Signal::SIGTERM)?;
//!
//! // 128 + SIGTERM
//! assert_eq!(process.wait().await?, 143);
//! # Ok(())
//! # }
//! ```
//!
//! There is no built-in timeout. Race [`Process::wait`] against
//! `tokio::time::timeout` and call [`Process::signal`] when it fires.

pub mod completion;
pub mod config;
pub mod error;
pub mod exit_status;
pub mod process;

pub use completion::{Completion, CompletionGuard};
pub use config::{Endpoint, ProcessConfig};
pub use error::{Result, SupervisorError};
pub use exit_status::{decode, WaitOutcome};
pub use process::Process;

#[cfg(unix)]
pub use nix::sys::signal::Signal;
