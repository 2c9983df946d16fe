//! Per-call cancellation and deadlines.
//!
//! Every executor call takes a [`Cancellation`]. It can carry a timeout, an
//! explicit signal fired through a [`CancelHandle`], both, or neither.
//!
//! ```ignore
//! let (handle, cancel) = Cancellation::new();
//! let cancel = cancel.with_timeout(Duration::from_secs(5));
//! tokio::spawn(async move {
//!     shutdown.await;
//!     handle.cancel();
//! });
//! db.select_with(&cancel, &["id"], "jobs", "", &[]).await?;
//! ```

use std::time::Duration;
use tokio::sync::watch;

/// Fires the paired [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Abort every call currently using the paired `Cancellation`, and every
    /// later call that uses it.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Cancel signal and timeout for executor calls.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    timeout: Option<Duration>,
    signal: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    /// A cancellation driven by the returned handle.
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            Self {
                timeout: None,
                signal: Some(rx),
            },
        )
    }

    /// No signal and no timeout of its own.
    pub fn none() -> Self {
        Self::default()
    }

    /// Abort once `timeout` has elapsed since the call started.
    pub fn timeout(timeout: Duration) -> Self {
        Self::none().with_timeout(timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
    }

    /// The shorter of this cancellation's timeout and `default`.
    pub fn effective_timeout(&self, default: Option<Duration>) -> Option<Duration> {
        match (self.timeout, default) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves when the signal fires. Pending forever without a signal, or
    /// once the handle is dropped unfired.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.signal else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}
