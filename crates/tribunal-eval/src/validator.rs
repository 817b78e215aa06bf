//! Trust boundary between provider-generated results and the rest of the
//! engine. Whole-field structural absence is already rejected at
//! deserialization inside the adapters; this layer owns value constraints
//! and fails fast on the first violation.

use tribunal_core::{
    EvaluationResult, TribunalError, REFERENCE_CATEGORIES, RELEVANCE_TARGETS,
};

pub fn validate(result: &EvaluationResult) -> Result<(), TribunalError> {
    for (name, value) in result.metrics.fields() {
        if !(0..=100).contains(&value) {
            return Err(TribunalError::Validation(format!(
                "Metric '{name}' must be between 0 and 100"
            )));
        }
    }

    let feedback = &result.feedback;
    if feedback.summary.trim().is_empty() {
        return Err(TribunalError::Validation(
            "feedback.summary is required".to_string(),
        ));
    }
    if feedback.prompt_request_suggestion.trim().is_empty() {
        return Err(TribunalError::Validation(
            "feedback.promptRequestSuggestion is required".to_string(),
        ));
    }

    for (index, reference) in feedback.references.iter().enumerate() {
        if reference.title.trim().is_empty() {
            return Err(TribunalError::Validation(format!(
                "references[{index}]: title is required"
            )));
        }
        if reference.description.trim().is_empty() {
            return Err(TribunalError::Validation(format!(
                "references[{index}]: description is required"
            )));
        }
        if !REFERENCE_CATEGORIES.contains(&reference.category.as_str()) {
            return Err(TribunalError::Validation(format!(
                "references[{index}]: category '{}' is not a valid category",
                reference.category
            )));
        }
        if !RELEVANCE_TARGETS.contains(&reference.relevance_to_score.as_str()) {
            return Err(TribunalError::Validation(format!(
                "references[{index}]: relevanceToScore '{}' is not a valid target",
                reference.relevance_to_score
            )));
        }
    }

    let metadata = &result.metadata;
    if metadata.provider_id.trim().is_empty() {
        return Err(TribunalError::Validation(
            "metadata.providerId is required".to_string(),
        ));
    }
    if metadata.timestamp <= 0 {
        return Err(TribunalError::Validation(
            "metadata.timestamp is required".to_string(),
        ));
    }

    Ok(())
}

/// Non-throwing form of `validate`.
pub fn is_valid(result: &EvaluationResult) -> bool {
    validate(result).is_ok()
}
