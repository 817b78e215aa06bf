use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tribunal_core::{EvaluationInput, EvaluationResult, ProviderAdapter, TribunalError};
use tribunal_registry::ProviderInstance;

use crate::backend::{ProviderBackend, ProviderRequest, ProviderResponse};
use crate::prompt::{build_evaluation_prompt, SYSTEM_INSTRUCTION};
use crate::verdict::{ensure_ready, parse_verdict, resolved_max_tokens, resolved_temperature};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiAdapter {
    instance: ProviderInstance,
    backend: Arc<dyn ProviderBackend>,
}

impl GeminiAdapter {
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

        let mut generation_config = json!({});
        if let Some(temperature) = resolved_temperature(&self.instance, input) {
            generation_config["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = resolved_max_tokens(&self.instance, input) {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }

        let body = json!({
            "system_instruction": {"parts": [{"text": SYSTEM_INSTRUCTION}]},
            "contents": [
                {"role": "user", "parts": [{"text": build_evaluation_prompt(input)}]},
            ],
            "generationConfig": generation_config,
        });

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        headers.extend(self.instance.config.custom_headers.iter().cloned());

        ProviderRequest {
            url: format!(
                "{}/v1beta/models/{}:generateContent?key={}",
                base_url, self.instance.config.model, self.instance.config.api_key
            ),
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

fn completion_text(resp: &ProviderResponse) -> Result<String, TribunalError> {
    check_error_status(resp)?;
    let mut text = String::new();
    if let Some(parts) = resp.body["candidates"][0]["content"]["parts"].as_array() {
        for part in parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            }
        }
    }
    if text.trim().is_empty() {
        return Err(TribunalError::EmptyResponse(
            "Gemini returned no completion text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
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
        let model_version = resp.body["modelVersion"].as_str().map(str::to_string);
        parse_verdict(&self.instance, started, &text, model_version)
    }
}
