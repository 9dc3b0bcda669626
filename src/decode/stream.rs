// ABOUTME: Lazy payload stream over a transport byte stream.
// ABOUTME: Composes FrameDecoder and EventDecoder one chunk at a time.

use futures::{Stream, StreamExt};
use tracing::debug;

use super::{EventDecoder, FrameDecoder, Payload};
use crate::error::StreamError;

/// Turn a byte stream into the payloads it carries, in arrival order.
///
/// The returned stream is finite and single-use. Transport errors end it;
/// an unterminated remainder at close is discarded.
pub fn payload_stream<S>(bytes: S) -> impl Stream<Item = Result<Payload, StreamError>> + Send
where
    S: Stream<Item = Result<Vec<u8>, StreamError>> + Send,
{
    async_stream::try_stream! {
        futures::pin_mut!(bytes);
        let mut frames = FrameDecoder::new();
        let mut events = EventDecoder::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for frame in frames.feed(&chunk) {
                if let Some(payload) = events.decode(&frame) {
                    yield payload;
                }
            }
        }

        if let Some(rest) = frames.finish() {
            debug!(len = rest.len(), "discarding unterminated frame at close");
        }
        if events.malformed() > 0 {
            debug!(count = events.malformed(), "malformed frames skipped");
        }
    }
}
