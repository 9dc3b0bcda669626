// ABOUTME: Client configuration - backend base URL, credentials, and connect timeout.
// ABOUTME: Loads from environment variables or a JSON file with defaulted fields.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default backend address when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Path prefix shared by every backend route.
pub const API_PREFIX: &str = "/api/v1";

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Backend endpoints that open a streamed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    ChatStream,
    CompareStream,
}

impl Route {
    /// Path of the route relative to the API prefix.
    pub fn path(&self) -> &'static str {
        match self {
            Route::ChatStream => "/chat/stream",
            Route::CompareStream => "/compare/stream",
        }
    }
}

/// Configuration shared by every stream a client opens.
///
/// The credentials are opaque: they are forwarded exactly as the rest of the
/// application attaches them to its API calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub csrf_token: Option<String>,
    pub cookie: Option<String>,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            csrf_token: None,
            cookie: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            user_agent: format!("selectstream/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at the given backend.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Build a config from `SELECTSTREAM_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("SELECTSTREAM_BASE_URL") {
            config.base_url = url;
        }
        config.csrf_token = std::env::var("SELECTSTREAM_CSRF_TOKEN").ok();
        config.cookie = std::env::var("SELECTSTREAM_COOKIE").ok();
        config
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the anti-forgery token.
    pub fn csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Set the session cookie header value.
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// Set the connect timeout in seconds.
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Check that the base URL parses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Full URL of a route on the configured backend.
    pub fn url_for(&self, route: Route) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            API_PREFIX,
            route.path()
        )
    }
}
