//! Shared cancellation signal
//!
//! A [`CancelSignal`] is cloned into every task of a phase. The first task to
//! fail cancels it; siblings observe it at their next I/O boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cooperative, clonable cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    /// Create a signal in the non-cancelled state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every holder of this signal
    ///
    /// Idempotent: only the first call wakes waiters.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("cancellation signalled");
            self.inner.notify.notify_waiters();
        }
    }

    /// Check whether the signal was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the signal is cancelled
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Return `Err(on_cancel())` when cancelled
    ///
    /// Intended for I/O boundaries inside tasks:
    ///
    /// ```rust
    /// use orc_tasks::CancelSignal;
    ///
    /// let signal = CancelSignal::new();
    /// assert!(signal.check(|| "cancelled").is_ok());
    /// signal.cancel();
    /// assert_eq!(signal.check(|| "cancelled"), Err("cancelled"));
    /// ```
    ///
    /// # Errors
    /// Returns the provided error once the signal has been cancelled.
    #[inline]
    pub fn check<E>(&self, on_cancel: impl FnOnce() -> E) -> Result<(), E> {
        if self.is_cancelled() {
            Err(on_cancel())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn signal_starts_active() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        clone.cancel();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_wakes_waiter() {
        let signal = CancelSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        signal.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_cancelled() {
        let signal = CancelSignal::new();
        signal.cancel();
        signal.cancel();
        tokio::time::timeout(Duration::from_millis(50), signal.cancelled())
            .await
            .unwrap();
    }
}
