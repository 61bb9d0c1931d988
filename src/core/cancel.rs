//! Cooperative cancellation tokens.
//!
//! Long-running work (activation side effects, batch fan-outs, cleanup
//! sweeps) periodically checks a shared token and winds down voluntarily
//! rather than being forcibly terminated. Tokens are cheap to clone; all
//! clones observe the same cancelled state.

use std::sync::Arc;
use tokio::sync::watch;

/// A cooperative cancellation token.
///
/// Built on a `watch` channel: `cancel` flips the shared flag once,
/// `cancelled` resolves for every clone, and `is_cancelled` is a cheap
/// synchronous check suitable for per-iteration polling.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Cancel the token. Idempotent; all clones observe the change.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Check whether the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled.
    ///
    /// Resolves immediately if cancellation already happened.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
    }
}
