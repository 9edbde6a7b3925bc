//! Cooperative cancellation for the polling loop.
//!
//! A `tokio::sync::watch` boolean: the handle flips it, the signal is checked
//! at the top of every iteration and raced against the poll sleep.

use tokio::sync::watch;

/// Owner side; call [`ShutdownHandle::cancel`] to request a clean stop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

/// Observer side, held by the session loop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/signal pair.
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

impl ShutdownHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Another observer for the same handle.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownSignal {
    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested.
    ///
    /// If every handle is dropped without cancelling, nobody can cancel any
    /// more and this never resolves.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Sleep for `period` unless cancelled first. Returns `true` on cancellation.
    pub async fn sleep_or_cancel(&mut self, period: std::time::Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        let interrupted = tokio::select! {
            _ = tokio::time::sleep(period) => false,
            _ = self.cancelled() => true,
        };
        interrupted || self.is_cancelled()
    }
}
