// ABOUTME: Transport abstraction - opens a streamed response body for a route.
// ABOUTME: Implementations: HTTP via reqwest, and an in-memory replay transport.

mod http;
mod replay;

pub use http::*;
pub use replay::*;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::Route;
use crate::error::StreamError;

/// Raw response body chunks, as they arrive.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, StreamError>> + Send + 'static>>;

/// One outbound streaming request.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub route: Route,
    pub body: serde_json::Value,
}

impl StreamRequest {
    pub fn new(route: Route, body: serde_json::Value) -> Self {
        Self { route, body }
    }
}

/// Opens streamed responses. Credentials and timeouts are the transport's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the body stream once the response is accepted.
    async fn open(&self, request: StreamRequest) -> Result<ByteStream, StreamError>;
}

/// End a byte stream as soon as the token is cancelled, dropping any pending read.
pub fn abortable(bytes: ByteStream, token: CancellationToken) -> ByteStream {
    Box::pin(bytes.take_until(token.cancelled_owned()))
}
