// ABOUTME: Decode module - turns raw transport bytes into JSON payloads.
// ABOUTME: Layers byte decoding, frame splitting, and payload-frame parsing.

mod bytes;
mod frames;
mod payload;
mod stream;

pub use bytes::*;
pub use frames::*;
pub use payload::*;
pub use stream::*;
