use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current time as epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Error)]
pub enum TribunalError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("duplicate instance id: {0}")]
    DuplicateId(String),
    #[error("instance not found: {0}")]
    NotFound(String),
    #[error("no template registered for provider kind: {0}")]
    UnknownTemplate(String),
    #[error("instance not found: {0}")]
    InstanceNotFound(String),
    #[error("instance disabled or missing API key: {0}")]
    InstanceDisabled(String),
    #[error("provider HTTP error ({status}): {message}")]
    ProviderHttp { status: u16, message: String },
    #[error("provider returned no completion text: {0}")]
    EmptyResponse(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("all instances failed: {0}")]
    AllInstancesFailed(String),
    #[error("no enabled provider instances")]
    NoEnabledInstances,
    #[error("config store error: {0}")]
    Store(String),
    #[error("timeout: {0}")]
    Timeout(String),
}

/// Per-call overrides for an instance's generation parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One (prompt, response) pair submitted for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub user_prompt: String,
    pub ai_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<GenerationOverrides>,
}

impl EvaluationInput {
    pub fn new(user_prompt: impl Into<String>, ai_response: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            ai_response: ai_response.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: GenerationOverrides) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Both text fields must be non-empty after trimming.
    pub fn validate(&self) -> Result<(), TribunalError> {
        if self.user_prompt.trim().is_empty() {
            return Err(TribunalError::Validation(
                "userPrompt must be a non-empty string".to_string(),
            ));
        }
        if self.ai_response.trim().is_empty() {
            return Err(TribunalError::Validation(
                "aiResponse must be a non-empty string".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scores in [0,100]. Bounds are enforced by the validator, not the type,
/// because the values originate from untrusted provider output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub relevance: i64,
    pub accuracy: i64,
    pub completeness: i64,
    pub coherence: i64,
    pub overall: i64,
}

impl EvaluationMetrics {
    pub fn fields(&self) -> [(&'static str, i64); 5] {
        [
            ("relevance", self.relevance),
            ("accuracy", self.accuracy),
            ("completeness", self.completeness),
            ("coherence", self.coherence),
            ("overall", self.overall),
        ]
    }
}

pub const REFERENCE_CATEGORIES: &[&str] = &[
    "fact-check",
    "source",
    "contradiction",
    "supporting-evidence",
    "methodology",
];

pub const RELEVANCE_TARGETS: &[&str] = &["relevance", "accuracy", "completeness", "coherence"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReference {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "relevanceToScore")]
    pub relevance_to_score: String,
}

/// Qualitative feedback from one provider. Every field defaults so that a
/// partially-filled provider reply still deserializes; the validator is the
/// layer that rejects missing values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFeedback {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, rename = "promptRequestSuggestion")]
    pub prompt_request_suggestion: String,
    #[serde(default)]
    pub references: Vec<EvaluationReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub provider_id: String,
    pub timestamp: i64,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

/// One provider instance's validated verdict on one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub metrics: EvaluationMetrics,
    pub feedback: EvaluationFeedback,
    pub metadata: ResultMetadata,
}

/// Aggregate of all successful per-instance results for one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    pub metrics: EvaluationMetrics,
    pub feedback: EvaluationFeedback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    /// Every requested instance produced a valid result.
    Completed,
    /// At least one requested instance failed.
    Partial,
}

/// The persisted record of one completed evaluation. `instance_results` is an
/// ordered array of `(instance_id, result)` pairs; the pair form is also the
/// wire format, so no map conversion is needed on (de)serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub status: EvaluationStatus,
    pub id: String,
    pub instance_results: Vec<(String, EvaluationResult)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_metrics: Option<EvaluationMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_feedback: Option<EvaluationFeedback>,
}

impl EvaluationRecord {
    pub fn result_for(&self, instance_id: &str) -> Option<&EvaluationResult> {
        self.instance_results
            .iter()
            .find(|(id, _)| id == instance_id)
            .map(|(_, r)| r)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub user_input: String,
    pub ai_response: String,
    pub timestamp: i64,
    pub evaluation: EvaluationRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateLookup {
    pub has_duplicate: bool,
    pub entry: Option<HistoryEntry>,
}

impl DuplicateLookup {
    pub fn miss() -> Self {
        Self {
            has_duplicate: false,
            entry: None,
        }
    }

    pub fn hit(entry: HistoryEntry) -> Self {
        Self {
            has_duplicate: true,
            entry: Some(entry),
        }
    }
}

/// The single capability every vendor adapter implements. The orchestrator
/// only ever talks to this trait, never to a concrete vendor.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Id of the instance this adapter was built from.
    fn instance_id(&self) -> &str;

    /// Whether the underlying instance has a usable API key.
    fn is_configured(&self) -> bool;

    async fn evaluate(&self, input: &EvaluationInput) -> Result<EvaluationResult, TribunalError>;
}

/// Key-value configuration store. Implementations must not block; the
/// registry and history call these inline with their mutations.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// Receives per-instance failures during a multi-instance evaluation so the
/// caller can surface them without losing the overall result.
pub trait FailureSink: Send + Sync {
    fn on_failure(&self, instance_id: &str, error: &TribunalError);
}
