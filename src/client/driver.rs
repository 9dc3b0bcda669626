// ABOUTME: The read loop - pulls payloads off the transport and applies them in order.
// ABOUTME: Converts every failure mode into session state instead of returning errors.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::decode::payload_stream;
use crate::error::StreamError;
use crate::session::{Session, SharedSession};
use crate::transport::{StreamRequest, Transport, abortable};

/// Drive one session to a terminal state.
///
/// Events are applied one at a time in arrival order. The loop stops as soon as
/// the session is terminal, the token is cancelled, or the body ends.
pub(crate) async fn drive<S: Session>(
    transport: Arc<dyn Transport>,
    request: StreamRequest,
    shared: Arc<SharedSession<S>>,
    token: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!("cancelled before the stream opened");
            return;
        }
        opened = transport.open(request) => opened,
    };

    let bytes = match opened {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "stream failed to open");
            shared.update(|s| s.fail(e.to_string()));
            return;
        }
    };

    let payloads = payload_stream(abortable(bytes, token.clone()));
    futures::pin_mut!(payloads);

    while let Some(item) = payloads.next().await {
        let payload = match item {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "stream read failed");
                shared.update(|s| s.fail(e.to_string()));
                return;
            }
        };

        let envelope = match payload.parse::<S::Envelope>() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "payload does not match envelope, skipping");
                continue;
            }
        };

        let terminal = shared.update(|s| {
            for event in S::events(envelope) {
                if s.is_terminal() {
                    break;
                }
                s.apply(event);
            }
            s.is_terminal()
        });
        if terminal {
            debug!("session reached terminal state");
            return;
        }
    }

    if token.is_cancelled() {
        shared.update(|s| s.cancel());
    } else {
        shared.update(|s| s.fail(StreamError::StreamClosed.to_string()));
    }
}
