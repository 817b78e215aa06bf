use tribunal_core::EvaluationInput;

/// Fixed system instruction shared by every vendor adapter.
pub const SYSTEM_INSTRUCTION: &str = "You are an impartial evaluator of AI assistant responses. \
Judge the response strictly on its own merits against the user's request. \
You MUST respond with a single valid JSON object matching the requested schema. \
Do not include any text outside the JSON object.";

const RESPONSE_SCHEMA: &str = r#"{
  "metrics": {
    "relevance": <integer 0-100>,
    "accuracy": <integer 0-100>,
    "completeness": <integer 0-100>,
    "coherence": <integer 0-100>,
    "overall": <integer 0-100>
  },
  "feedback": {
    "strengths": ["..."],
    "weaknesses": ["..."],
    "suggestions": ["..."],
    "summary": "...",
    "promptRequestSuggestion": "an improved version of the user's prompt",
    "references": [
      {
        "title": "...",
        "url": "optional",
        "description": "...",
        "category": "fact-check | source | contradiction | supporting-evidence | methodology",
        "relevanceToScore": "relevance | accuracy | completeness | coherence"
      }
    ]
  }
}"#;

/// Evaluation request embedding the captured prompt/response pair.
pub fn build_evaluation_prompt(input: &EvaluationInput) -> String {
    format!(
        "Evaluate the following AI response.\n\n\
         User prompt:\n{}\n\n\
         AI response:\n{}\n\n\
         Respond with JSON in exactly this shape:\n{}",
        input.user_prompt, input.ai_response, RESPONSE_SCHEMA
    )
}
