//! Cooperative cancellation for a running batch.

use std::time::Duration;
use tokio::sync::watch;

/// Coordinator for cancelling a batch.
///
/// The scheduler checks the signal before starting each operation; an
/// in-flight submission always runs to completion first.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new coordinator in the not-triggered state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger cancellation. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Dropping the sender leaves the value at `false` forever.
        drop(tx);
        Self { rx }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until triggered. Pends forever if the coordinator is dropped untriggered.
    pub async fn triggered(&mut self) {
        let closed = self.rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Sleep for `delay`, returning early with `false` if cancellation fires.
    pub async fn sleep(&mut self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.is_triggered();
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.triggered() => false,
        }
    }
}
