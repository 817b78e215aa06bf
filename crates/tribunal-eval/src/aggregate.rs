//! Pure combination of N validated per-instance results into one aggregate.
//! No provider is authoritative: metrics are averaged, qualitative feedback
//! is unioned so nothing a provider surfaced is lost.

use tribunal_core::{CombinedResult, EvaluationFeedback, EvaluationMetrics, EvaluationResult};

/// Per-field arithmetic mean, rounded half-up. Empty input yields the
/// all-zero metrics: the cached/duplicate paths may combine zero fresh
/// results, and that is a defined state, not an error.
pub fn combine_metrics(results: &[EvaluationResult]) -> EvaluationMetrics {
    if results.is_empty() {
        return EvaluationMetrics::default();
    }
    let n = results.len() as f64;
    let mean = |pick: fn(&EvaluationMetrics) -> i64| -> i64 {
        let sum: i64 = results.iter().map(|r| pick(&r.metrics)).sum();
        (sum as f64 / n).round() as i64
    };
    EvaluationMetrics {
        relevance: mean(|m| m.relevance),
        accuracy: mean(|m| m.accuracy),
        completeness: mean(|m| m.completeness),
        coherence: mean(|m| m.coherence),
        overall: mean(|m| m.overall),
    }
}

pub fn combine_feedback(results: &[EvaluationResult]) -> EvaluationFeedback {
    let mut strengths: Vec<String> = Vec::new();
    let mut weaknesses: Vec<String> = Vec::new();
    let mut suggestions: Vec<String> = Vec::new();
    let mut references = Vec::new();
    let mut prompt_request_suggestion = String::new();

    for result in results {
        let feedback = &result.feedback;
        push_unique(&mut strengths, &feedback.strengths);
        push_unique(&mut weaknesses, &feedback.weaknesses);
        push_unique(&mut suggestions, &feedback.suggestions);
        // references are concatenated, not deduplicated
        references.extend(feedback.references.iter().cloned());
        // longest suggestion wins; the first seen wins ties
        if feedback.prompt_request_suggestion.chars().count()
            > prompt_request_suggestion.chars().count()
        {
            prompt_request_suggestion = feedback.prompt_request_suggestion.clone();
        }
    }

    let summary = format!(
        "Combined evaluation from {} provider instance(s) with an average score of {}/100. \
         Key strengths include: {}. Areas for improvement: {}.",
        results.len(),
        combine_metrics(results).overall,
        first_two(&strengths),
        first_two(&weaknesses),
    );

    EvaluationFeedback {
        strengths,
        weaknesses,
        suggestions,
        summary,
        prompt_request_suggestion,
        references,
    }
}

pub fn combine(results: &[EvaluationResult]) -> CombinedResult {
    CombinedResult {
        metrics: combine_metrics(results),
        feedback: combine_feedback(results),
    }
}

/// Set union with first-seen order preserved.
fn push_unique(into: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

fn first_two(items: &[String]) -> String {
    items
        .iter()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}
