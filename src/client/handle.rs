// ABOUTME: StreamHandle - a caller's live, read-only view of one session.
// ABOUTME: Exposes snapshots, status, waiting, and cooperative cancellation.

use std::sync::Arc;

use uuid::Uuid;

use crate::session::{
    CancellationController, ChatSession, ComparisonSession, Session, SessionStatus, SharedSession,
};

/// Handle to one streaming session.
pub struct StreamHandle<S: Session> {
    id: Uuid,
    shared: Arc<SharedSession<S>>,
    controller: CancellationController<S>,
}

/// Handle for a single chat turn.
pub type ChatStreamHandle = StreamHandle<ChatSession>;

/// Handle for a multi-provider comparison.
pub type ComparisonStreamHandle = StreamHandle<ComparisonSession>;

impl<S: Session> StreamHandle<S> {
    pub(crate) fn new(
        id: Uuid,
        shared: Arc<SharedSession<S>>,
        controller: CancellationController<S>,
    ) -> Self {
        Self {
            id,
            shared,
            controller,
        }
    }

    /// Identifier of this stream, used in log output.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current snapshot of the session.
    pub fn state(&self) -> S::State {
        self.shared.read(|s| s.snapshot())
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.read(|s| s.status())
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Stop the stream. Returns true if it was still live.
    ///
    /// Once this returns, the state no longer changes.
    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    /// Wait until the session is terminal and return its final snapshot.
    pub async fn wait(&self) -> S::State {
        self.shared.wait_terminal().await
    }

    /// Wait for the next state change.
    pub async fn changed(&self) {
        self.shared.changed().await
    }
}

impl<S: Session> std::fmt::Debug for StreamHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}
