//! Cooperative stop signal shared by every bridge loop.
//!
//! Each loop checks [`ShutdownSignal::is_running`] once per iteration and
//! sleeps through [`ShutdownSignal::sleep`], which returns early as soon as a
//! stop is requested.  A loop that is stuck inside a bounded I/O call simply
//! notices the flag when that call returns.

use std::time::Duration;

use tokio::sync::watch;

/// Clonable stop flag backed by a `watch` channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Creates a signal in the running state.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    /// Returns `true` until [`stop`](Self::stop) has been called.
    pub fn is_running(&self) -> bool {
        !*self.rx.borrow()
    }

    /// Requests every holder of this signal to stop.  Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Sleeps for `duration` or until a stop is requested.
    ///
    /// Returns `true` if the full duration elapsed and the bridge is still running.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let mut rx = self.rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_running(),
            _ = rx.wait_for(|stopped| *stopped) => false,
        }
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
