// ABOUTME: Parameters for opening chat and comparison streams.
// ABOUTME: Serializes them into the JSON bodies the backend expects.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::session::ModelSelection;

/// Minimum number of models a comparison needs.
pub const MIN_COMPARISON_MODELS: usize = 2;

/// A message in the outbound chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Parameters for one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatParams {
    pub conversation_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub provider: String,
    pub model: String,
}

impl ChatParams {
    /// Start a new conversation with a single user message.
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: None,
            messages: vec![ChatMessage::user(message)],
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Continue an existing conversation.
    pub fn conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub(crate) fn body(&self) -> Result<serde_json::Value, StreamError> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Serialize)]
struct ProviderRef<'a> {
    provider: &'a str,
    model: &'a str,
}

#[derive(Serialize)]
struct CompareBody<'a> {
    prompt: &'a str,
    providers: Vec<ProviderRef<'a>>,
}

/// Parameters for one side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonParams {
    pub prompt: String,
    pub selections: Vec<ModelSelection>,
}

impl ComparisonParams {
    pub fn new(prompt: impl Into<String>, selections: Vec<ModelSelection>) -> Self {
        Self {
            prompt: prompt.into(),
            selections,
        }
    }

    /// Reject blank prompts and fewer than two models.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.prompt.trim().is_empty() || self.selections.len() < MIN_COMPARISON_MODELS {
            return Err(StreamError::InvalidRequest(
                "Please enter a prompt and select at least 2 models".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn body(&self) -> Result<serde_json::Value, StreamError> {
        let body = CompareBody {
            prompt: &self.prompt,
            providers: self
                .selections
                .iter()
                .map(|s| ProviderRef {
                    provider: &s.provider,
                    model: &s.model,
                })
                .collect(),
        };
        Ok(serde_json::to_value(body)?)
    }
}
