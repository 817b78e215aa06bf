use std::time::Instant;

use serde::Deserialize;
use tribunal_core::{
    now_ms, EvaluationFeedback, EvaluationInput, EvaluationMetrics, EvaluationResult,
    ResultMetadata, TribunalError,
};
use tribunal_registry::ProviderInstance;

use crate::extract::extract_json;

/// Canonical `{metrics, feedback}` payload every vendor is asked to emit.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    metrics: EvaluationMetrics,
    feedback: EvaluationFeedback,
}

/// Precondition shared by every adapter: a usable API key and non-empty
/// input, checked before any network call.
pub(crate) fn ensure_ready(
    instance: &ProviderInstance,
    input: &EvaluationInput,
) -> Result<(), TribunalError> {
    if !instance.is_configured() {
        return Err(TribunalError::Validation(format!(
            "instance '{}' has no API key configured",
            instance.id
        )));
    }
    input.validate()
}

/// Turn a completion text into an `EvaluationResult` with metadata attached.
pub(crate) fn parse_verdict(
    instance: &ProviderInstance,
    started: Instant,
    text: &str,
    model_version: Option<String>,
) -> Result<EvaluationResult, TribunalError> {
    let json = extract_json(text).ok_or_else(|| {
        TribunalError::MalformedResponse(format!(
            "no JSON object found in completion from '{}'",
            instance.id
        ))
    })?;
    let raw: RawVerdict = serde_json::from_str(json).map_err(|e| {
        TribunalError::MalformedResponse(format!("'{}': {e}", instance.id))
    })?;
    Ok(EvaluationResult {
        metrics: raw.metrics,
        feedback: raw.feedback,
        metadata: ResultMetadata {
            provider_id: instance.id.clone(),
            timestamp: now_ms(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            model_version: model_version.or_else(|| Some(instance.config.model.clone())),
        },
    })
}

/// Per-call overrides win over the instance's configured parameters.
pub(crate) fn resolved_temperature(
    instance: &ProviderInstance,
    input: &EvaluationInput,
) -> Option<f64> {
    input
        .parameters
        .as_ref()
        .and_then(|p| p.temperature)
        .or(instance.config.temperature)
}

pub(crate) fn resolved_max_tokens(
    instance: &ProviderInstance,
    input: &EvaluationInput,
) -> Option<u32> {
    input
        .parameters
        .as_ref()
        .and_then(|p| p.max_tokens)
        .or(instance.config.max_tokens)
}
