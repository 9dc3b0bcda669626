// ABOUTME: Recognizes payload frames and parses their JSON bodies.
// ABOUTME: Field names are not interpreted here; sessions pick their own envelope.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Marker that starts every payload frame.
pub const DATA_PREFIX: &str = "data:";

/// End-of-stream sentinel some backends send in place of a JSON body.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A parsed JSON body from one payload frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload(serde_json::Value);

impl Payload {
    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Interpret the payload as a session-specific envelope.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.0)
    }
}

/// Strip the payload marker from a frame, returning the body.
///
/// A single space after the marker and a trailing `\r` are tolerated.
pub fn strip_data_prefix(frame: &str) -> Option<&str> {
    let frame = frame.strip_suffix('\r').unwrap_or(frame);
    let body = frame.strip_prefix(DATA_PREFIX)?;
    Some(body.strip_prefix(' ').unwrap_or(body))
}

/// Turns frames into payloads, skipping anything that is not one.
///
/// Malformed bodies are logged and counted, never raised.
#[derive(Debug, Default)]
pub struct EventDecoder {
    malformed: usize,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one frame. Returns `None` for non-payload and malformed frames.
    pub fn decode(&mut self, frame: &str) -> Option<Payload> {
        let body = strip_data_prefix(frame)?;
        if body.trim() == DONE_SENTINEL {
            debug!("skipping [DONE] sentinel");
            return None;
        }

        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => Some(Payload(value)),
            Err(e) => {
                self.malformed += 1;
                warn!(error = %e, frame = body, "failed to parse payload frame");
                None
            }
        }
    }

    /// How many payload frames failed to parse so far.
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}
