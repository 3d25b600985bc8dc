//! Run-level cancellation.
//!
//! A [`CancelHandle`] fires once; every cloned [`CancelSignal`] observes it.
//! The instant of cancellation is recorded so all stages share one hard
//! deadline (`cancelled_at + grace`).

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Fires the run's cancellation.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<Option<Instant>>,
}

impl CancelHandle {
    /// Request cancellation. Idempotent: the first call's instant is kept.
    pub fn cancel(&self) {
        self.tx.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(Instant::now());
            true
        });
    }
}

/// Observes the run's cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<Option<Instant>>,
}

/// Create a connected handle/signal pair.
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(None);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(None);
        Self { rx }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Resolves with the cancellation instant. Pends forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&self) -> Instant {
        let mut rx = self.rx.clone();
        loop {
            if let Some(at) = *rx.borrow_and_update() {
                return at;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Resolves `grace` after cancellation was requested.
    pub async fn hard_deadline(&self, grace: Duration) {
        let at = self.cancelled().await;
        tokio::time::sleep_until(at + grace).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_observes_cancel() {
        let (handle, signal) = cancel_pair();
        assert!(!signal.is_cancelled());
        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(signal.clone().is_cancelled());
    }

    #[tokio::test]
    async fn second_cancel_keeps_first_instant() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        let first = signal.cancelled().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.cancel();
        assert_eq!(signal.cancelled().await, first);
    }

    #[tokio::test]
    async fn never_signal_does_not_resolve() {
        let signal = CancelSignal::never();
        let result =
            tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(result.is_err());
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_handle_without_cancel_never_fires() {
        let (handle, signal) = cancel_pair();
        drop(handle);
        let result =
            tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn hard_deadline_waits_for_grace() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        let start = Instant::now();
        signal.hard_deadline(Duration::from_secs(3)).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
