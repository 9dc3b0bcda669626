// ABOUTME: Client module - the caller-facing entry points for streaming.
// ABOUTME: StreamClient opens chat and comparison streams and returns live handles.

mod driver;
mod handle;
mod request;
mod stream_client;

pub use handle::*;
pub use request::*;
pub use stream_client::*;
