// ABOUTME: CancellationController - cooperative cancellation for one session.
// ABOUTME: Shares a token with the transport and forces the session into Cancelled.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Session, SharedSession};

/// Something that can stop an in-flight session.
pub trait Cancellable: Send + Sync {
    /// Returns true if the session was still live.
    fn cancel(&self) -> bool;

    fn is_cancelled(&self) -> bool;
}

/// Owns the token observed by the transport and the read loop.
///
/// Cancelling trips the token, which aborts any pending read, then moves the
/// session to `Cancelled` under its lock so no later event can land.
pub struct CancellationController<S> {
    token: CancellationToken,
    shared: Arc<SharedSession<S>>,
}

impl<S> Clone for CancellationController<S> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<S: Session> CancellationController<S> {
    pub(crate) fn new(shared: Arc<SharedSession<S>>) -> Self {
        Self {
            token: CancellationToken::new(),
            shared,
        }
    }

    /// Token for the transport side.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) -> bool {
        self.token.cancel();
        let cancelled = self.shared.update(|s| s.cancel());
        if cancelled {
            debug!("session cancelled");
        }
        cancelled
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<S: Session> Cancellable for CancellationController<S> {
    fn cancel(&self) -> bool {
        CancellationController::cancel(self)
    }

    fn is_cancelled(&self) -> bool {
        CancellationController::is_cancelled(self)
    }
}
