// ABOUTME: StreamClient - opens chat and comparison streams over a transport.
// ABOUTME: Enforces one active session per client by cancelling the previous one.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use super::driver::drive;
use super::{ChatParams, ChatStreamHandle, ComparisonParams, ComparisonStreamHandle, StreamHandle};
use crate::config::{ClientConfig, Route};
use crate::error::StreamError;
use crate::session::{
    Cancellable, CancellationController, ChatSession, ComparisonSession, Session, SharedSession,
};
use crate::transport::{HttpTransport, StreamRequest, Transport};

/// Opens streaming sessions against one backend.
///
/// At most one session streams per client: opening a new one cancels
/// whatever was still active.
pub struct StreamClient {
    transport: Arc<dyn Transport>,
    active: Mutex<Option<Arc<dyn Cancellable>>>,
}

impl StreamClient {
    /// Create a client that talks HTTP to the configured backend.
    pub fn new(config: ClientConfig) -> Result<Self, StreamError> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }

    /// Create a client over any transport.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self::with_shared_transport(Arc::new(transport))
    }

    /// Create a client over a transport that is shared elsewhere.
    pub fn with_shared_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            active: Mutex::new(None),
        }
    }

    /// Start streaming one chat turn. Must be called inside a tokio runtime.
    pub fn open_chat_stream(&self, params: ChatParams) -> ChatStreamHandle {
        let request = params
            .body()
            .map(|body| StreamRequest::new(Route::ChatStream, body));
        self.open(ChatSession::new(), request)
    }

    /// Start streaming a side-by-side comparison. Must be called inside a tokio runtime.
    ///
    /// Invalid parameters produce a handle that is already failed; no request is sent.
    pub fn open_comparison_stream(&self, params: ComparisonParams) -> ComparisonStreamHandle {
        let request = params
            .validate()
            .and_then(|()| params.body())
            .map(|body| StreamRequest::new(Route::CompareStream, body));
        self.open(ComparisonSession::new(&params.selections), request)
    }

    /// Cancel the active session, if any. Returns true if one was still live.
    pub fn cancel_active(&self) -> bool {
        match self.active.lock().take() {
            Some(active) => active.cancel(),
            None => false,
        }
    }

    fn open<S: Session>(
        &self,
        mut session: S,
        request: Result<StreamRequest, StreamError>,
    ) -> StreamHandle<S> {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            if previous.cancel() {
                debug!("cancelled previous active session");
            }
        }

        let id = Uuid::new_v4();
        session.begin();
        let shared = Arc::new(SharedSession::new(session));
        let controller = CancellationController::new(shared.clone());

        match request {
            Ok(request) => {
                let span = info_span!("stream", id = %id, route = ?request.route);
                tokio::spawn(
                    drive(
                        self.transport.clone(),
                        request,
                        shared.clone(),
                        controller.token(),
                    )
                    .instrument(span),
                );
                *active = Some(Arc::new(controller.clone()));
            }
            Err(e) => {
                debug!(id = %id, error = %e, "request rejected before sending");
                shared.update(|s| s.fail(e.to_string()));
            }
        }

        StreamHandle::new(id, shared, controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ModelSelection, SessionStatus};
    use crate::transport::ReplayTransport;

    #[tokio::test]
    async fn test_invalid_comparison_fails_without_request() {
        let transport = Arc::new(ReplayTransport::new());
        let client = StreamClient::with_shared_transport(transport.clone());

        let handle = client.open_comparison_stream(ComparisonParams::new(
            "hi",
            vec![ModelSelection::new("openai", "gpt-4o")],
        ));

        let state = handle.wait().await;
        assert_eq!(state.status, SessionStatus::Failed);
        assert_eq!(
            state.error.as_deref(),
            Some("Please enter a prompt and select at least 2 models")
        );
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_active_without_session() {
        let client = StreamClient::with_transport(ReplayTransport::new());
        assert!(!client.cancel_active());
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert!(StreamClient::new(ClientConfig::new("::nope::")).is_err());
    }
}
