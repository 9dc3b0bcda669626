// ABOUTME: HTTP transport - POSTs JSON and streams the response body via reqwest.
// ABOUTME: Attaches the same CSRF header and session cookie as other API calls.

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use super::{ByteStream, StreamRequest, Transport};
use crate::config::{CSRF_HEADER, ClientConfig};
use crate::error::StreamError;

/// Streams responses from the chat backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: ClientConfig,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport for the given backend config.
    pub fn new(config: ClientConfig) -> Result<Self, StreamError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| StreamError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Pull a readable message out of an error response body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.get("error"))
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    });

    match message {
        Some(message) => message,
        None if body.trim().is_empty() => "Failed to start streaming".to_string(),
        None => body.trim().to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: StreamRequest) -> Result<ByteStream, StreamError> {
        let url = self.config.url_for(request.route);
        debug!(url = %url, "opening stream");

        let mut builder = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream");

        if let Some(token) = &self.config.csrf_token {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(cookie) = &self.config.cookie {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }

        let response = builder.json(&request.body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(StreamError::from));
        Ok(Box::pin(bytes))
    }
}
