//! Session Close Signal

use std::sync::Arc;
use tokio::sync::watch;

/// Shared "closed" flag for one relay session.
///
/// Either pump loop may close the session any number of times; the first call
/// wakes every loop currently waiting in [`SessionCloser::closed`].
#[derive(Debug, Clone)]
pub struct SessionCloser {
    tx: Arc<watch::Sender<bool>>,
}

impl SessionCloser {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Mark the session closed. Returns true only for the call that flipped it.
    pub fn close(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the session has been closed
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this cannot observe a dropped channel.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for SessionCloser {
    fn default() -> Self {
        Self::new()
    }
}
