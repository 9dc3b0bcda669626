// ABOUTME: Single-turn chat session - accumulates one assistant reply.
// ABOUTME: Consumes the flat chat envelope (content, error, done, conversationId).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::event::{deserialize_opt_id, deserialize_opt_message};
use super::{CANCELLED_MESSAGE, Session, SessionStatus, StreamEvent};

/// Wire shape of a chat payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEnvelope {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub conversation_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_message")]
    pub error: Option<String>,
}

/// Snapshot of a chat session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSessionState {
    pub session_id: Option<String>,
    pub text: String,
    pub streaming: bool,
    pub error: Option<String>,
    pub status: SessionStatus,
}

/// State machine for one in-flight chat exchange.
#[derive(Debug)]
pub struct ChatSession {
    session_id: Option<String>,
    text: String,
    status: SessionStatus,
    error: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            session_id: None,
            text: String::new(),
            status: SessionStatus::Idle,
            error: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for ChatSession {
    type Envelope = ChatEnvelope;
    type State = ChatSessionState;

    fn events(envelope: ChatEnvelope) -> Vec<StreamEvent> {
        if let Some(message) = envelope.error.filter(|e| !e.is_empty()) {
            return vec![StreamEvent::SessionFailed { message }];
        }

        let mut events = Vec::new();
        if let Some(content) = envelope.content.filter(|c| !c.is_empty()) {
            events.push(StreamEvent::text(content));
        }
        if envelope.done == Some(true) {
            events.push(StreamEvent::SessionDone {
                session_id: envelope.conversation_id,
            });
        }
        events
    }

    fn begin(&mut self) {
        if self.status == SessionStatus::Idle {
            self.status = SessionStatus::Streaming;
        }
    }

    fn apply(&mut self, event: StreamEvent) {
        if self.status != SessionStatus::Streaming {
            debug!(status = %self.status, "chat session ignoring event");
            return;
        }

        match event {
            StreamEvent::Started => {}
            StreamEvent::Chunk { text, .. } => self.text.push_str(&text),
            StreamEvent::SessionFailed { message } => {
                debug!(error = %message, "chat session failed");
                self.status = SessionStatus::Failed;
                self.error = Some(message);
            }
            StreamEvent::SessionDone { session_id } => {
                if self.session_id.is_none() {
                    self.session_id = session_id;
                }
                self.status = SessionStatus::Done;
            }
            StreamEvent::ProviderCompleted { .. } | StreamEvent::ProviderFailed { .. } => {
                debug!("chat session ignoring provider event");
            }
        }
    }

    fn fail(&mut self, message: String) {
        if self.is_terminal() {
            return;
        }
        self.status = SessionStatus::Failed;
        self.error = Some(message);
    }

    fn cancel(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Cancelled;
        self.error = Some(CANCELLED_MESSAGE.to_string());
        true
    }

    fn status(&self) -> SessionStatus {
        self.status
    }

    fn snapshot(&self) -> ChatSessionState {
        ChatSessionState {
            session_id: self.session_id.clone(),
            text: self.text.clone(),
            streaming: self.status == SessionStatus::Streaming,
            error: self.error.clone(),
            status: self.status,
        }
    }
}
