//! Cooperative cancellation for in-flight resolutions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// A clonable cancellation flag.
///
/// All clones observe the same flag. Once canceled a token stays canceled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Creates a token that is not canceled.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Cancels every clone of this token.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once the token is canceled.
    pub async fn canceled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|canceled| *canceled).await.is_err() {
            // The sender lives as long as any clone, so this is unreachable
            // while `self` exists.
            std::future::pending::<()>().await;
        }
    }

    /// Sleeps for `duration` unless canceled first. Returns `true` if the
    /// sleep was cut short by cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(duration) => self.is_canceled(),
            () = self.canceled() => true,
        }
    }
}
