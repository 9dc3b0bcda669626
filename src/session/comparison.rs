// ABOUTME: Comparison session - N providers streaming side by side.
// ABOUTME: Fans events into per-provider accumulators and isolates provider failures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::event::{deserialize_opt_id, deserialize_opt_message};
use super::{
    CANCELLED_MESSAGE, FinalMetrics, Session, SessionStatus, StreamEvent, estimate_tokens,
};

/// Response text shown for a provider that failed without a message.
pub const PROVIDER_FAILED_MESSAGE: &str = "Provider request failed";

/// One (provider, model) pair chosen for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ModelSelection {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            label: None,
            color: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Where one provider's response is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Streaming,
    Completed,
    Failed,
    /// The session finished before this provider reported an outcome.
    Incomplete,
    Cancelled,
}

/// Append-only record of one provider's response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderAccumulator {
    pub provider: String,
    pub model: String,
    pub label: String,
    pub color: Option<String>,
    pub response: String,
    pub elapsed_secs: f64,
    pub first_chunk_secs: Option<f64>,
    pub tokens: u64,
    pub status: ProviderStatus,
}

impl ProviderAccumulator {
    fn seeded(selection: &ModelSelection) -> Self {
        Self {
            provider: selection.provider.clone(),
            model: selection.model.clone(),
            label: selection
                .label
                .clone()
                .unwrap_or_else(|| format!("{} {}", selection.provider, selection.model)),
            color: selection.color.clone(),
            response: String::new(),
            elapsed_secs: 0.0,
            first_chunk_secs: None,
            tokens: 0,
            status: ProviderStatus::Streaming,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.status == ProviderStatus::Streaming
    }

    /// True for provider errors and for providers left incomplete.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ProviderStatus::Failed | ProviderStatus::Incomplete)
    }

    fn append(&mut self, text: &str, elapsed_secs: Option<f64>, is_first: bool) {
        self.response.push_str(text);
        if let Some(elapsed) = elapsed_secs.filter(|t| *t > 0.0) {
            self.elapsed_secs = elapsed;
        }
        if is_first && self.first_chunk_secs.is_none() {
            self.first_chunk_secs = elapsed_secs;
            info!(
                provider = %self.provider,
                model = %self.model,
                elapsed = ?elapsed_secs,
                "first chunk received"
            );
        }
    }

    fn complete(&mut self, metrics: FinalMetrics) {
        if self.response.is_empty() {
            if let Some(response) = metrics.response {
                self.response = response;
            }
        }
        if let Some(time) = metrics.time {
            self.elapsed_secs = time;
        }
        self.tokens = metrics
            .tokens
            .unwrap_or_else(|| estimate_tokens(&self.response));
        self.status = ProviderStatus::Completed;
    }

    fn fail(&mut self, message: String) {
        self.response = message;
        self.status = ProviderStatus::Failed;
    }
}

/// Wire shape of a comparison payload, discriminated by `event`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ComparisonEnvelope {
    Start,
    Chunk {
        #[serde(default)]
        provider: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        chunk: Option<String>,
        #[serde(default)]
        time: Option<f64>,
        #[serde(default)]
        first_chunk: bool,
    },
    Complete {
        #[serde(default)]
        provider: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        data: Option<FinalMetrics>,
    },
    Error {
        #[serde(default)]
        provider: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default, deserialize_with = "deserialize_opt_message")]
        error: Option<String>,
    },
    Done {
        #[serde(default, rename = "comparisonId", deserialize_with = "deserialize_opt_id")]
        comparison_id: Option<String>,
    },
}

fn target(provider: Option<String>, model: Option<String>) -> Option<(String, String)> {
    match (provider, model) {
        (Some(p), Some(m)) if !p.is_empty() => Some((p, m)),
        _ => None,
    }
}

/// Snapshot of a comparison session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSessionState {
    /// Accumulators in selection order.
    pub providers: Vec<ProviderAccumulator>,
    pub session_id: Option<String>,
    pub streaming: bool,
    pub error: Option<String>,
    pub status: SessionStatus,
}

impl ComparisonSessionState {
    /// Look up one accumulator by its (provider, model) key.
    pub fn get(&self, provider: &str, model: &str) -> Option<&ProviderAccumulator> {
        self.providers
            .iter()
            .find(|acc| acc.provider == provider && acc.model == model)
    }
}

/// State machine for one multi-provider comparison.
#[derive(Debug)]
pub struct ComparisonSession {
    accumulators: Vec<ProviderAccumulator>,
    index: HashMap<(String, String), usize>,
    session_id: Option<String>,
    status: SessionStatus,
    error: Option<String>,
}

impl ComparisonSession {
    /// Seed one streaming placeholder per selection, before any network activity.
    ///
    /// Repeated (provider, model) pairs keep their first selection.
    pub fn new(selections: &[ModelSelection]) -> Self {
        let mut accumulators = Vec::with_capacity(selections.len());
        let mut index = HashMap::new();
        for selection in selections {
            let key = (selection.provider.clone(), selection.model.clone());
            if index.contains_key(&key) {
                warn!(provider = %key.0, model = %key.1, "duplicate selection ignored");
                continue;
            }
            index.insert(key, accumulators.len());
            accumulators.push(ProviderAccumulator::seeded(selection));
        }

        Self {
            accumulators,
            index,
            session_id: None,
            status: SessionStatus::Idle,
            error: None,
        }
    }

    pub fn accumulators(&self) -> &[ProviderAccumulator] {
        &self.accumulators
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Mutable access to a still-streaming accumulator.
    fn live(&mut self, provider: &str, model: &str) -> Option<&mut ProviderAccumulator> {
        let idx = self
            .index
            .get(&(provider.to_string(), model.to_string()))
            .copied();
        let Some(idx) = idx else {
            warn!(provider, model, "event for unselected provider ignored");
            return None;
        };
        let acc = &mut self.accumulators[idx];
        if !acc.is_streaming() {
            debug!(provider, model, status = ?acc.status, "event for finished provider ignored");
            return None;
        }
        Some(acc)
    }

    /// Close out every accumulator still streaming.
    fn settle(&mut self, status: ProviderStatus) {
        for acc in self.accumulators.iter_mut().filter(|a| a.is_streaming()) {
            if status == ProviderStatus::Incomplete {
                warn!(provider = %acc.provider, model = %acc.model, "provider never finished");
            }
            acc.status = status;
        }
    }
}

impl Session for ComparisonSession {
    type Envelope = ComparisonEnvelope;
    type State = ComparisonSessionState;

    fn events(envelope: ComparisonEnvelope) -> Vec<StreamEvent> {
        let event = match envelope {
            ComparisonEnvelope::Start => StreamEvent::Started,
            ComparisonEnvelope::Chunk {
                provider,
                model,
                chunk,
                time,
                first_chunk,
            } => {
                let Some((provider, model)) = target(provider, model) else {
                    debug!("chunk without provider and model skipped");
                    return Vec::new();
                };
                StreamEvent::Chunk {
                    provider: Some(provider),
                    model: Some(model),
                    text: chunk.unwrap_or_default(),
                    elapsed_secs: time,
                    is_first: first_chunk,
                }
            }
            ComparisonEnvelope::Complete {
                provider,
                model,
                data,
            } => {
                let Some((provider, model)) = target(provider, model) else {
                    debug!("complete without provider and model skipped");
                    return Vec::new();
                };
                StreamEvent::ProviderCompleted {
                    provider,
                    model,
                    metrics: data.unwrap_or_default(),
                }
            }
            ComparisonEnvelope::Error {
                provider,
                model,
                error,
            } => {
                let message = error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| PROVIDER_FAILED_MESSAGE.to_string());
                match (provider.filter(|p| !p.is_empty()), model) {
                    (Some(provider), Some(model)) => StreamEvent::ProviderFailed {
                        provider,
                        model,
                        message,
                    },
                    (Some(provider), None) => {
                        warn!(
                            provider = %provider,
                            error = %message,
                            "provider error without model skipped"
                        );
                        return Vec::new();
                    }
                    (None, _) => StreamEvent::SessionFailed { message },
                }
            }
            ComparisonEnvelope::Done { comparison_id } => StreamEvent::SessionDone {
                session_id: comparison_id,
            },
        };
        vec![event]
    }

    fn begin(&mut self) {
        if self.status == SessionStatus::Idle {
            self.status = SessionStatus::Streaming;
        }
    }

    fn apply(&mut self, event: StreamEvent) {
        if self.status != SessionStatus::Streaming {
            debug!(status = %self.status, "comparison session ignoring event");
            return;
        }

        match event {
            StreamEvent::Started => debug!("comparison stream started"),
            StreamEvent::Chunk {
                provider: Some(provider),
                model: Some(model),
                text,
                elapsed_secs,
                is_first,
            } => {
                if let Some(acc) = self.live(&provider, &model) {
                    acc.append(&text, elapsed_secs, is_first);
                }
            }
            StreamEvent::Chunk { .. } => debug!("untargeted chunk ignored"),
            StreamEvent::ProviderCompleted {
                provider,
                model,
                metrics,
            } => {
                if let Some(acc) = self.live(&provider, &model) {
                    acc.complete(metrics);
                }
            }
            StreamEvent::ProviderFailed {
                provider,
                model,
                message,
            } => {
                if let Some(acc) = self.live(&provider, &model) {
                    debug!(provider = %provider, model = %model, error = %message, "provider failed");
                    acc.fail(message);
                }
            }
            StreamEvent::SessionFailed { message } => self.fail(message),
            StreamEvent::SessionDone { session_id } => {
                if self.session_id.is_none() {
                    self.session_id = session_id;
                }
                self.settle(ProviderStatus::Incomplete);
                self.status = SessionStatus::Done;
            }
        }
    }

    fn fail(&mut self, message: String) {
        if self.is_terminal() {
            return;
        }
        self.settle(ProviderStatus::Incomplete);
        self.status = SessionStatus::Failed;
        self.error = Some(message);
    }

    fn cancel(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.settle(ProviderStatus::Cancelled);
        self.status = SessionStatus::Cancelled;
        self.error = Some(CANCELLED_MESSAGE.to_string());
        true
    }

    fn status(&self) -> SessionStatus {
        self.status
    }

    fn snapshot(&self) -> ComparisonSessionState {
        ComparisonSessionState {
            providers: self.accumulators.clone(),
            session_id: self.session_id.clone(),
            streaming: self.status == SessionStatus::Streaming,
            error: self.error.clone(),
            status: self.status,
        }
    }
}
