//! Per-run completion gate
//!
//! One gate is created for every run. The reaper holds the only
//! [`CompletionGuard`]; everything else observes the run through cloned
//! [`Completion`] handles. The exit code and the release of waiters travel
//! in the same `watch` update, so anyone who sees the gate closed also sees
//! the final code.

use tokio::sync::watch;

use crate::exit_status::GENERIC_FAILURE;

/// Read side of a run's completion gate
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<Option<i32>>,
}

/// Write side of a run's completion gate, closes it exactly once
#[derive(Debug)]
pub struct CompletionGuard {
    tx: watch::Sender<Option<i32>>,
}

impl Completion {
    /// Create an open gate and its single write side
    pub fn new() -> (Self, CompletionGuard) {
        let (tx, rx) = watch::channel(None);
        (Self { rx }, CompletionGuard { tx })
    }

    /// True until the gate closes
    pub fn is_running(&self) -> bool {
        self.rx.borrow().is_none()
    }

    /// Final exit code, once the gate has closed
    pub fn exit_code(&self) -> Option<i32> {
        *self.rx.borrow()
    }

    /// Wait for the gate to close and return the exit code
    ///
    /// Returns immediately if the run already completed.
    pub async fn wait(&self) -> i32 {
        let mut rx = self.rx.clone();
        let published = rx.wait_for(Option::is_some).await.map(|code| *code);
        match published {
            Ok(code) => code.unwrap_or(GENERIC_FAILURE),
            // The guard always publishes before it goes away
            Err(_) => self.exit_code().unwrap_or(GENERIC_FAILURE),
        }
    }
}

impl CompletionGuard {
    /// Publish the exit code and release every waiter
    ///
    /// Only the first call has an effect.
    pub fn finish(&self, code: i32) {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(code);
            true
        });
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        // Reaper never reached finish (task aborted, runtime shutting down)
        self.finish(GENERIC_FAILURE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_gate() {
        let (completion, _guard) = Completion::new();
        assert!(completion.is_running());
        assert_eq!(completion.exit_code(), None);
    }

    #[tokio::test]
    async fn test_finish_releases_waiters() {
        let (completion, guard) = Completion::new();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let completion = completion.clone();
                tokio::spawn(async move { completion.wait().await })
            })
            .collect();

        guard.finish(7);

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), 7);
        }
        assert!(!completion.is_running());
    }

    #[tokio::test]
    async fn test_finish_is_write_once() {
        let (completion, guard) = Completion::new();
        guard.finish(3);
        guard.finish(9);
        assert_eq!(completion.exit_code(), Some(3));
        assert_eq!(completion.wait().await, 3);
    }

    #[tokio::test]
    async fn test_late_waiter_sees_result() {
        let (completion, guard) = Completion::new();
        guard.finish(0);
        drop(guard);

        let result = tokio::time::timeout(Duration::from_secs(1), completion.wait()).await;
        assert_eq!(result.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropped_guard_closes_gate() {
        let (completion, guard) = Completion::new();
        drop(guard);

        assert!(!completion.is_running());
        assert_eq!(completion.wait().await, GENERIC_FAILURE);
    }
}
