use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tribunal_core::{EvaluationInput, EvaluationResult, ProviderAdapter, TribunalError};

/// Adapter test double that replays a queue of canned outcomes and counts
/// how often it was called.
pub struct ScriptedAdapter {
    id: String,
    configured: bool,
    calls: AtomicUsize,
    responses: Mutex<VecDeque<Result<EvaluationResult, TribunalError>>>,
}

impl ScriptedAdapter {
    pub fn new(
        id: impl Into<String>,
        responses: Vec<Result<EvaluationResult, TribunalError>>,
    ) -> Self {
        Self {
            id: id.into(),
            configured: true,
            calls: AtomicUsize::new(0),
            responses: Mutex::new(VecDeque::from(responses)),
        }
    }

    pub fn unconfigured(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            configured: false,
            calls: AtomicUsize::new(0),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn instance_id(&self) -> &str {
        &self.id
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn evaluate(&self, _input: &EvaluationInput) -> Result<EvaluationResult, TribunalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().await;
        responses.pop_front().unwrap_or_else(|| {
            Err(TribunalError::EmptyResponse(format!(
                "scripted adapter '{}' exhausted responses",
                self.id
            )))
        })
    }
}
