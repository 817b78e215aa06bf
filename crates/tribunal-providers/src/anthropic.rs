use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tribunal_core::{EvaluationInput, EvaluationResult, ProviderAdapter, TribunalError};
use tribunal_registry::ProviderInstance;

use crate::backend::{ProviderBackend, ProviderRequest, ProviderResponse};
use crate::prompt::{build_evaluation_prompt, SYSTEM_INSTRUCTION};
use crate::verdict::{ensure_ready, parse_verdict, resolved_max_tokens, resolved_temperature};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

// the Messages API requires max_tokens
const FALLBACK_MAX_TOKENS: u32 = 2048;

pub struct AnthropicAdapter {
    instance: ProviderInstance,
    backend: Arc<dyn ProviderBackend>,
}

impl AnthropicAdapter {
    pub fn new(instance: ProviderInstance, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { instance, backend }
    }

    fn build_request(&self, input: &EvaluationInput) -> ProviderRequest {
        let base_url = self
            .instance
            .config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);

        let mut body = json!({
            "model": self.instance.config.model,
            "max_tokens": resolved_max_tokens(&self.instance, input).unwrap_or(FALLBACK_MAX_TOKENS),
            "system": SYSTEM_INSTRUCTION,
            "messages": [
                {"role": "user", "content": build_evaluation_prompt(input)},
            ],
        });
        if let Some(temperature) = resolved_temperature(&self.instance, input) {
            body["temperature"] = json!(temperature);
        }

        let mut headers = vec![
            ("x-api-key".to_string(), self.instance.config.api_key.clone()),
            ("anthropic-version".to_string(), API_VERSION.to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        headers.extend(self.instance.config.custom_headers.iter().cloned());

        ProviderRequest {
            url: format!("{base_url}/v1/messages"),
            headers,
            body,
        }
    }
}

fn check_error_status(resp: &ProviderResponse) -> Result<(), TribunalError> {
    if resp.status >= 400 {
        let message = resp.body["error"]["message"]
            .as_str()
            .unwrap_or("unknown API error")
            .to_string();
        return Err(TribunalError::ProviderHttp {
            status: resp.status,
            message,
        });
    }
    Ok(())
}

/// Concatenate the text blocks of the reply.
fn completion_text(resp: &ProviderResponse) -> Result<String, TribunalError> {
    check_error_status(resp)?;
    let mut text = String::new();
    if let Some(blocks) = resp.body["content"].as_array() {
        for block in blocks {
            if block["type"].as_str() == Some("text") {
                if let Some(t) = block["text"].as_str() {
                    text.push_str(t);
                }
            }
        }
    }
    if text.trim().is_empty() {
        return Err(TribunalError::EmptyResponse(
            "Anthropic returned no completion text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn instance_id(&self) -> &str {
        &self.instance.id
    }

    fn is_configured(&self) -> bool {
        self.instance.is_configured()
    }

    async fn evaluate(&self, input: &EvaluationInput) -> Result<EvaluationResult, TribunalError> {
        ensure_ready(&self.instance, input)?;
        let started = Instant::now();
        let resp = self.backend.send(self.build_request(input)).await?;
        let text = completion_text(&resp)?;
        let model_version = resp.body["model"].as_str().map(str::to_string);
        parse_verdict(&self.instance, started, &text, model_version)
    }
}
