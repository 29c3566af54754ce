//! Supervised shell process

use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

#[cfg(unix)]
use nix::{errno::Errno, sys::signal::Signal, unistd::Pid};

use crate::{
    completion::{Completion, CompletionGuard},
    config::ProcessConfig,
    error::{Result, SupervisorError},
    exit_status::{self, WaitOutcome, GENERIC_FAILURE},
};

/// One spawn-to-termination lifecycle
#[derive(Debug)]
struct Run {
    /// Cached at spawn, None if the spawn failed
    pid: Option<u32>,
    completion: Completion,
}

/// Supervises one shell command, one run at a time
///
/// Every run gets a single reaper task that waits on the child and closes
/// the run's completion gate. All the wait and status operations read that
/// one gate, so any number of callers can observe the same run.
///
/// The instance is reusable: once a run has exited, `start` or `run` begins
/// a new one with a fresh gate. Methods that spawn tasks must be called from
/// within a tokio runtime.
#[derive(Debug)]
pub struct Process {
    config: ProcessConfig,
    run: Mutex<Option<Run>>,
}

impl Process {
    /// Supervise `command` with default configuration
    pub fn new(command: impl Into<String>) -> Self {
        Self::with_config(ProcessConfig::new(command))
    }

    /// Supervise a fully configured command
    pub fn with_config(config: ProcessConfig) -> Self {
        Self {
            config,
            run: Mutex::new(None),
        }
    }

    /// The command line given to the shell
    pub fn command(&self) -> &str {
        &self.config.command
    }

    /// Get process configuration
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Start the process without waiting for it to complete
    ///
    /// Fails with [`SupervisorError::AlreadyRunning`] while a previous run is
    /// still going. If the spawn fails no reaper task is spawned: the new run
    /// is closed inline with exit code 1, so waiters never hang on it.
    pub fn start(&self) -> Result<()> {
        self.launch().map(|_| ())
    }

    /// Start the process and wait for it to complete
    pub async fn run(&self) -> Result<i32> {
        let completion = self.launch()?;
        Ok(completion.wait().await)
    }

    fn launch(&self) -> Result<Completion> {
        let mut run = self.run.lock();
        if run.as_ref().is_some_and(|r| r.completion.is_running()) {
            return Err(SupervisorError::AlreadyRunning);
        }

        let (completion, guard) = Completion::new();
        debug!(command = %self.config.command, shell = ?self.config.shell, "Spawning process");

        match self.spawn() {
            Ok(child) => {
                let pid = child.id();
                info!(pid = ?pid, command = %self.config.command, "Process spawned");
                *run = Some(Run {
                    pid,
                    completion: completion.clone(),
                });
                tokio::spawn(reap(child, pid, guard));
                Ok(completion)
            }
            Err(e) => {
                warn!(command = %self.config.command, error = %e, "Failed to spawn process");
                guard.finish(GENERIC_FAILURE);
                *run = Some(Run {
                    pid: None,
                    completion,
                });
                Err(SupervisorError::Spawn(e))
            }
        }
    }

    fn spawn(&self) -> std::io::Result<Child> {
        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c").arg(&self.config.command);

        if let Some(ref dir) = self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.config.env);

        cmd.stdin(self.config.stdin.to_stdio()?);
        cmd.stdout(self.config.stdout.to_stdio()?);
        cmd.stderr(self.config.stderr.to_stdio()?);

        cmd.spawn()
    }

    /// Send a signal to the process
    ///
    /// Delivery errors come back from the OS unchanged. Once the run has been
    /// reaped its PID may belong to another process, so nothing is sent and
    /// the call fails with `ESRCH`, the same as signalling a dead PID.
    #[cfg(unix)]
    pub fn signal(&self, signal: Signal) -> Result<()> {
        let run = self.run.lock();
        let run = run.as_ref().ok_or(SupervisorError::NotRunning)?;
        let pid = run.pid.ok_or(SupervisorError::NotRunning)?;

        if !run.completion.is_running() {
            debug!(pid = %pid, signal = ?signal, "Process already exited, signal not sent");
            return Err(Errno::ESRCH.into());
        }

        debug!(pid = %pid, signal = ?signal, "Sending signal");
        nix::sys::signal::kill(Pid::from_raw(pid as i32), signal)?;
        Ok(())
    }

    /// Process ID of the current run, still available after it exited
    pub fn pid(&self) -> Result<u32> {
        self.run
            .lock()
            .as_ref()
            .and_then(|r| r.pid)
            .ok_or(SupervisorError::NotRunning)
    }

    /// Wait for the current run to complete and return its exit code
    ///
    /// Can be called any number of times, from any number of tasks; after
    /// completion it returns the same code immediately.
    pub async fn wait(&self) -> Result<i32> {
        let completion = self.completion().ok_or(SupervisorError::NotRunning)?;
        Ok(completion.wait().await)
    }

    /// Receiver fired once the current run completes
    ///
    /// Returns `None` if the process was never started. Every call gets an
    /// independent receiver.
    pub fn wait_ch(&self) -> Option<oneshot::Receiver<()>> {
        let completion = self.completion()?;
        let (tx, rx) = oneshot::channel();
        tokio::spawn(relay(completion, tx));
        Some(rx)
    }

    /// Fire the caller's channel once the current run completes
    ///
    /// # Panics
    ///
    /// Panics if the receiving half of `notify` has already been dropped,
    /// since nobody could ever observe the notification.
    pub fn wait_on_ch(&self, notify: oneshot::Sender<()>) -> Result<()> {
        let completion = self.completion().ok_or(SupervisorError::NotRunning)?;
        assert!(
            !notify.is_closed(),
            "wait_on_ch called with a channel whose receiver is gone"
        );
        tokio::spawn(relay(completion, notify));
        Ok(())
    }

    /// Exit code of the current run, without blocking
    pub fn exit_code(&self) -> Result<i32> {
        let completion = self.completion().ok_or(SupervisorError::NotStarted)?;
        completion.exit_code().ok_or(SupervisorError::StillRunning)
    }

    /// True iff the current run completed with exit code 0
    ///
    /// Never errors: not started, running and failed all report `false`.
    pub fn success(&self) -> bool {
        matches!(self.exit_code(), Ok(0))
    }

    /// Process has been started before
    pub fn started(&self) -> bool {
        self.run.lock().is_some()
    }

    /// Process is currently running
    pub fn running(&self) -> bool {
        self.run
            .lock()
            .as_ref()
            .is_some_and(|r| r.completion.is_running())
    }

    /// Process was started and is no longer running
    pub fn exited(&self) -> bool {
        self.run
            .lock()
            .as_ref()
            .is_some_and(|r| !r.completion.is_running())
    }

    fn completion(&self) -> Option<Completion> {
        self.run.lock().as_ref().map(|r| r.completion.clone())
    }
}

/// Wait on the child, decode its status and close the gate
async fn reap(mut child: Child, pid: Option<u32>, guard: CompletionGuard) {
    let result = child.wait().await;
    if let Err(ref e) = result {
        warn!(pid = ?pid, error = %e, "Failed to wait for process");
    }

    let code = exit_status::decode(WaitOutcome::from_wait_result(result));
    debug!(pid = ?pid, exit_code = code, "Process exited");
    guard.finish(code);
}

/// Forward completion into a oneshot, giving up if the receiver goes away
async fn relay(completion: Completion, mut notify: oneshot::Sender<()>) {
    let completed = tokio::select! {
        _ = completion.wait() => true,
        _ = notify.closed() => false,
    };

    if completed {
        let _ = notify.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoint;

    fn quiet(command: &str) -> Process {
        Process::with_config(
            ProcessConfig::new(command)
                .stdout(Endpoint::Null)
                .stderr(Endpoint::Null),
        )
    }

    #[tokio::test]
    async fn test_run_echo() {
        let process = quiet("echo test");
        assert_eq!(process.run().await.unwrap(), 0);
        assert!(process.success());
    }

    #[tokio::test]
    async fn test_not_started() {
        let process = quiet("echo test");
        assert!(matches!(process.pid(), Err(SupervisorError::NotRunning)));
        assert!(matches!(process.wait().await, Err(SupervisorError::NotRunning)));
        assert!(matches!(process.exit_code(), Err(SupervisorError::NotStarted)));
        assert!(process.wait_ch().is_none());
        assert!(!process.success());
    }

    #[tokio::test]
    async fn test_spawn_failure_closes_gate() {
        let process = Process::with_config(
            ProcessConfig::new("true").shell("/nonexistent/ricecoder-shell"),
        );

        assert!(matches!(process.start(), Err(SupervisorError::Spawn(_))));
        assert!(process.started());
        assert!(process.exited());
        assert!(!process.running());
        assert!(matches!(process.pid(), Err(SupervisorError::NotRunning)));
        assert!(matches!(
            process.signal(Signal::SIGTERM),
            Err(SupervisorError::NotRunning)
        ));
        assert_eq!(process.wait().await.unwrap(), GENERIC_FAILURE);
        assert!(!process.success());
    }

    #[tokio::test]
    async fn test_signal_after_exit_is_not_sent() {
        let process = quiet("true");
        assert_eq!(process.run().await.unwrap(), 0);

        let result = process.signal(Signal::SIGCONT);
        assert!(matches!(result, Err(SupervisorError::Signal(Errno::ESRCH))));
        assert_eq!(process.exit_code().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_env_and_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProcessConfig::new(r#"test "$RICE_VALUE" = ok && test "$(pwd -P)" = "$EXPECTED""#)
            .env("RICE_VALUE", "ok")
            .env("EXPECTED", dir.path().canonicalize().unwrap().display().to_string())
            .working_dir(dir.path().canonicalize().unwrap())
            .stdout(Endpoint::Null)
            .stderr(Endpoint::Null);

        let process = Process::with_config(config);
        assert_eq!(process.run().await.unwrap(), 0);
    }
}
