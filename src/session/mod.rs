// ABOUTME: Session module - state machines that consume stream events.
// ABOUTME: Chat and comparison sessions share StreamEvent and cancellation plumbing.

mod cancel;
mod chat;
mod comparison;
mod event;
mod shared;

pub use cancel::*;
pub use chat::*;
pub use comparison::*;
pub use event::*;
pub(crate) use shared::SharedSession;

use serde::de::DeserializeOwned;

/// Error text recorded on a session that was cancelled by the caller.
pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Lifecycle of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, not yet streaming.
    Idle,
    Streaming,
    Done,
    Failed,
    /// Stopped by the caller. Not an error condition.
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Done | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Streaming => write!(f, "streaming"),
            SessionStatus::Done => write!(f, "done"),
            SessionStatus::Failed => write!(f, "failed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A state machine driven by one stream of events.
///
/// All mutation goes through [`apply`](Self::apply), [`fail`](Self::fail) and
/// [`cancel`](Self::cancel). Once terminal, every call is a no-op.
pub trait Session: Send + 'static {
    /// Wire shape of a payload for this kind of session.
    type Envelope: DeserializeOwned;

    /// Read-only snapshot handed to callers.
    type State: Clone + Send + Sync + 'static;

    /// Translate one wire envelope into events, in application order.
    fn events(envelope: Self::Envelope) -> Vec<StreamEvent>;

    /// Move from `Idle` to `Streaming`.
    fn begin(&mut self);

    fn apply(&mut self, event: StreamEvent);

    /// Session-level failure not signalled by the server.
    fn fail(&mut self, message: String);

    /// Stop the session. Returns true if it was still live.
    fn cancel(&mut self) -> bool;

    fn status(&self) -> SessionStatus;

    fn snapshot(&self) -> Self::State;

    fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}
