// ABOUTME: StreamEvent - the typed events sessions consume.
// ABOUTME: Also holds the wire helpers shared by both envelope shapes.

use serde::{Deserialize, Deserializer};

/// One application-level event reconstructed from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The server acknowledged the session.
    Started,

    /// Incremental text, optionally tagged with its provider.
    Chunk {
        provider: Option<String>,
        model: Option<String>,
        text: String,
        elapsed_secs: Option<f64>,
        is_first: bool,
    },

    /// One provider finished.
    ProviderCompleted {
        provider: String,
        model: String,
        metrics: FinalMetrics,
    },

    /// One provider failed; siblings are unaffected.
    ProviderFailed {
        provider: String,
        model: String,
        message: String,
    },

    /// The whole exchange failed.
    SessionFailed { message: String },

    /// The whole exchange finished.
    SessionDone { session_id: Option<String> },
}

impl StreamEvent {
    /// Convenience constructor for an untagged text chunk.
    pub fn text(text: impl Into<String>) -> Self {
        StreamEvent::Chunk {
            provider: None,
            model: None,
            text: text.into(),
            elapsed_secs: None,
            is_first: false,
        }
    }
}

/// Final metrics a provider reports on completion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FinalMetrics {
    /// Total elapsed seconds.
    pub time: Option<f64>,
    #[serde(deserialize_with = "deserialize_opt_count")]
    pub tokens: Option<u64>,
    /// Full response text, when the backend sends it.
    pub response: Option<String>,
}

/// Rough token estimate: about four characters per token.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64 / 4).max(1)
}

/// Accept a count sent as an integer or a float.
fn deserialize_opt_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64))
}

/// Accept an identifier sent either as a string or as a number.
pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept an error sent as a string or as an object with a `message` field.
pub(crate) fn deserialize_opt_message<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Object(map)) => ["message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .or_else(|| Some(serde_json::Value::Object(map).to_string())),
        Some(other) => Some(other.to_string()),
    }
    .filter(|m| !m.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct WithId {
        #[serde(default, deserialize_with = "deserialize_opt_id")]
        id: Option<String>,
    }

    #[test]
    fn test_id_from_string_or_number() {
        let s: WithId = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert_eq!(s.id.as_deref(), Some("abc"));
        let n: WithId = serde_json::from_str(r#"{"id":17}"#).unwrap();
        assert_eq!(n.id.as_deref(), Some("17"));
        let null: WithId = serde_json::from_str(r#"{"id":null}"#).unwrap();
        assert!(null.id.is_none());
        let missing: WithId = serde_json::from_str("{}").unwrap();
        assert!(missing.id.is_none());
    }

    #[derive(Deserialize)]
    struct WithError {
        #[serde(default, deserialize_with = "deserialize_opt_message")]
        error: Option<String>,
    }

    #[test]
    fn test_message_from_string_or_object() {
        let parse = |json: &str| serde_json::from_str::<WithError>(json).unwrap().error;
        assert_eq!(parse(r#"{"error":"boom"}"#).as_deref(), Some("boom"));
        assert_eq!(parse(r#"{"error":{"message":"quota"}}"#).as_deref(), Some("quota"));
        assert_eq!(parse(r#"{"error":{"error":"nested"}}"#).as_deref(), Some("nested"));
        assert_eq!(parse(r#"{"error":{"code":7}}"#).as_deref(), Some(r#"{"code":7}"#));
        assert!(parse(r#"{"error":null}"#).is_none());
        assert!(parse(r#"{"error":""}"#).is_none());
        assert!(parse("{}").is_none());
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn test_final_metrics_partial() {
        let m: FinalMetrics = serde_json::from_str(r#"{"time": 1.5}"#).unwrap();
        assert_eq!(m.time, Some(1.5));
        assert!(m.tokens.is_none());

        let m: FinalMetrics = serde_json::from_str(r#"{"tokens": 12.0, "extra": true}"#).unwrap();
        assert_eq!(m.tokens, Some(12));
    }
}
