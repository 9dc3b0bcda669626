// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use selectstream::prelude::*;` to get started quickly.

pub use crate::client::{
    ChatMessage, ChatParams, ChatStreamHandle, ComparisonParams, ComparisonStreamHandle,
    StreamClient, StreamHandle,
};
pub use crate::config::{ClientConfig, Route};
pub use crate::error::{ConfigError, StreamError};
pub use crate::session::{
    CANCELLED_MESSAGE, ChatSessionState, ComparisonSessionState, ModelSelection,
    ProviderAccumulator, ProviderStatus, SessionStatus,
};
pub use crate::transport::{HttpTransport, ReplayTransport, Reply, Transport};
