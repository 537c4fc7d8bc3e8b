//! Run-level cancellation.
//!
//! A [`CancelHandle`] fires once; every [`CancelSignal`] cloned from the same
//! channel observes the first reason and ignores later ones.

use rosterstat_core::AbortReason;
use tokio::sync::watch;
use tracing::warn;

/// Creates a connected handle and signal.
pub fn channel() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(None);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Fires cancellation for a run.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<Option<AbortReason>>,
}

impl CancelHandle {
    /// Cancels the run. Returns false if it was already cancelled.
    pub fn cancel(&self, reason: AbortReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            warn!(reason = %reason, "Cancelling run");
            *current = Some(reason);
            true
        })
    }

    /// Returns a new signal observing this handle.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes cancellation for a run.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<Option<AbortReason>>,
}

impl CancelSignal {
    /// Returns a signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = channel();
        signal
    }

    /// Returns true once the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Returns the cancellation reason, if any.
    pub fn reason(&self) -> Option<AbortReason> {
        self.rx.borrow().clone()
    }

    /// Waits until the run is cancelled.
    ///
    /// Never completes if the handle is dropped without cancelling.
    pub async fn cancelled(&self) -> AbortReason {
        let mut rx = self.rx.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(reason) = current {
                return reason;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_reason_wins() {
        let (handle, signal) = channel();
        assert!(!signal.is_cancelled());

        assert!(handle.cancel(AbortReason::Timeout { after_secs: 5 }));
        assert!(!handle.cancel(AbortReason::Timeout { after_secs: 9 }));

        assert_eq!(signal.reason(), Some(AbortReason::Timeout { after_secs: 5 }));
        assert_eq!(signal.cancelled().await, AbortReason::Timeout { after_secs: 5 });
    }

    #[tokio::test]
    async fn test_waiters_wake_on_cancel() {
        let (handle, signal) = channel();
        let waiter = tokio::spawn(async move { signal.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel(AbortReason::Timeout { after_secs: 1 });

        let reason = waiter.await.unwrap();
        assert_eq!(reason, AbortReason::Timeout { after_secs: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        let signal = CancelSignal::never();
        let waited = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(waited.is_err());
        assert!(!signal.is_cancelled());
    }
}
