//! # Cancellation
//!
//! Cooperative cancellation for a single streamed turn.
//!
//! One token is created per send. The widget keeps a clone to abort with and
//! the stream client checks it at every suspension point. Cancelling is
//! idempotent: only the first call records a reason and wakes waiters.
//!
//! ```
//! use chat_relay_core::{CancellationReason, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let handle = token.clone();
//!
//! assert!(handle.cancel(CancellationReason::UserRequest));
//! assert!(!handle.cancel(CancellationReason::Teardown));
//!
//! assert!(token.is_cancelled());
//! assert_eq!(token.reason(), Some(CancellationReason::UserRequest));
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

/// Reason for cancellation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationReason {
    /// User pressed stop
    UserRequest,
    /// Owner was dropped or reset
    Teardown,
    /// Custom reason
    Custom(String),
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationReason::UserRequest => write!(f, "User requested cancellation"),
            CancellationReason::Teardown => write!(f, "Owner torn down"),
            CancellationReason::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    reason: RwLock<Option<CancellationReason>>,
    notify: Notify,
}

/// Cancellation token for cooperative cancellation
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// Returns `true` only for the call that actually flipped the token.
    pub fn cancel(&self, reason: CancellationReason) -> bool {
        if self
            .inner
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        debug!(%reason, "cancellation requested");
        *self.inner.reason.write() = Some(reason);
        self.inner.notify.notify_waiters();
        true
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Get the cancellation reason
    pub fn reason(&self) -> Option<CancellationReason> {
        self.inner.reason.read().clone()
    }

    /// Wait for cancellation
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
