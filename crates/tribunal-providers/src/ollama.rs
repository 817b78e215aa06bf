use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tribunal_core::{EvaluationInput, EvaluationResult, ProviderAdapter, TribunalError};
use tribunal_registry::ProviderInstance;

use crate::backend::{ProviderBackend, ProviderRequest, ProviderResponse};
use crate::prompt::{build_evaluation_prompt, SYSTEM_INSTRUCTION};
use crate::verdict::{ensure_ready, parse_verdict, resolved_max_tokens, resolved_temperature};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Local daemon adapter. No auth header; the instance still carries a
/// placeholder key so it counts as configured.
pub struct OllamaAdapter {
    instance: ProviderInstance,
    backend: Arc<dyn ProviderBackend>,
}

impl OllamaAdapter {
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

        let mut options = json!({});
        if let Some(temperature) = resolved_temperature(&self.instance, input) {
            options["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = resolved_max_tokens(&self.instance, input) {
            options["num_predict"] = json!(max_tokens);
        }

        let mut body = json!({
            "model": self.instance.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_INSTRUCTION},
                {"role": "user", "content": build_evaluation_prompt(input)},
            ],
            "stream": false,
        });
        if options.as_object().is_some_and(|o| !o.is_empty()) {
            body["options"] = options;
        }

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        headers.extend(self.instance.config.custom_headers.iter().cloned());

        ProviderRequest {
            url: format!("{base_url}/api/chat"),
            headers,
            body,
        }
    }
}

fn check_error_status(resp: &ProviderResponse) -> Result<(), TribunalError> {
    if resp.status >= 400 {
        let message = resp.body["error"]
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
    let text = resp.body["message"]["content"].as_str().unwrap_or("");
    if text.trim().is_empty() {
        return Err(TribunalError::EmptyResponse(
            "Ollama returned no completion text".to_string(),
        ));
    }
    Ok(text.to_string())
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
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
