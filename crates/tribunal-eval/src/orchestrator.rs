use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tribunal_core::{
    now_ms, CombinedResult, EvaluationInput, EvaluationRecord, EvaluationResult, EvaluationStatus,
    FailureSink, ProviderAdapter, TribunalError,
};
use tribunal_providers::AdapterFactory;
use tribunal_registry::{InstanceRegistry, ProviderInstance};
use uuid::Uuid;

use crate::aggregate;
use crate::history::EvaluationHistory;
use crate::validator;

/// Outcome of one multi-instance evaluation. `results` keeps requested-id
/// order, which fixes the first-seen tie-breaks in the combined feedback.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub entry_id: String,
    pub results: Vec<(String, EvaluationResult)>,
    pub combined: CombinedResult,
    pub failures: Vec<(String, String)>,
}

impl EvaluationOutcome {
    pub fn result_for(&self, instance_id: &str) -> Option<&EvaluationResult> {
        self.results
            .iter()
            .find(|(id, _)| id == instance_id)
            .map(|(_, r)| r)
    }
}

/// Failure sink that logs through `tracing`.
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn on_failure(&self, instance_id: &str, error: &TribunalError) {
        tracing::warn!(instance_id = %instance_id, error = %error, "instance evaluation failed");
    }
}

struct CachedAdapter {
    instance: ProviderInstance,
    adapter: Arc<dyn ProviderAdapter>,
}

/// Fans one input out to N provider instances concurrently, isolates
/// per-instance failures, validates every result, and combines the
/// survivors. All collaborators are injected; there is no global state.
pub struct Orchestrator {
    registry: Arc<InstanceRegistry>,
    factory: AdapterFactory,
    history: Arc<EvaluationHistory>,
    failure_sink: Option<Arc<dyn FailureSink>>,
    timeout: Option<Duration>,
    adapters: tokio::sync::Mutex<HashMap<String, CachedAdapter>>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<InstanceRegistry>,
        factory: AdapterFactory,
        history: Arc<EvaluationHistory>,
    ) -> Self {
        Self {
            registry,
            factory,
            history,
            failure_sink: None,
            timeout: None,
            adapters: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    /// Per-adapter deadline. A timed-out instance fails like any other;
    /// its siblings are unaffected.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn history(&self) -> &EvaluationHistory {
        &self.history
    }

    /// Evaluate against every enabled, configured instance.
    pub async fn evaluate_with_all_enabled(
        &self,
        input: &EvaluationInput,
    ) -> Result<EvaluationOutcome, TribunalError> {
        let enabled = self.registry.get_enabled();
        if enabled.is_empty() {
            return Err(TribunalError::NoEnabledInstances);
        }
        let ids: Vec<String> = enabled.into_iter().map(|i| i.id).collect();
        self.evaluate_with_instances(input, &ids).await
    }

    /// Evaluate against an explicit set of instance ids.
    pub async fn evaluate_with_instances(
        &self,
        input: &EvaluationInput,
        instance_ids: &[String],
    ) -> Result<EvaluationOutcome, TribunalError> {
        if instance_ids.is_empty() {
            return Err(TribunalError::Validation(
                "at least one instance required".to_string(),
            ));
        }
        input.validate()?;

        tracing::info!(instances = instance_ids.len(), "dispatching evaluation");
        let settled = join_all(
            instance_ids
                .iter()
                .map(|id| async move { (id.clone(), self.evaluate_one(input, id).await) }),
        )
        .await;

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (id, outcome) in settled {
            match outcome {
                Ok(result) => results.push((id, result)),
                Err(error) => {
                    if let Some(sink) = &self.failure_sink {
                        sink.on_failure(&id, &error);
                    }
                    tracing::warn!(instance_id = %id, error = %error, "instance failed");
                    failures.push((id, error.to_string()));
                }
            }
        }

        if results.is_empty() {
            let joined = failures
                .iter()
                .map(|(id, reason)| format!("{id}: {reason}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(TribunalError::AllInstancesFailed(joined));
        }

        let collected: Vec<EvaluationResult> =
            results.iter().map(|(_, r)| r.clone()).collect();
        let combined = aggregate::combine(&collected);

        let status = if failures.is_empty() {
            EvaluationStatus::Completed
        } else {
            EvaluationStatus::Partial
        };
        let record = EvaluationRecord {
            status,
            id: generate_run_id(),
            instance_results: results.clone(),
            combined_metrics: Some(combined.metrics),
            combined_feedback: Some(combined.feedback.clone()),
        };
        let entry = self
            .history
            .append(&input.user_prompt, &input.ai_response, record);

        Ok(EvaluationOutcome {
            entry_id: entry.id,
            results,
            combined,
            failures,
        })
    }

    /// Duplicate-aware entry point: a hit inside the history window replays
    /// the stored record without dispatching anything. There is no
    /// background refresh on a hit; callers wanting a fresh verdict use the
    /// plain entry points.
    pub async fn evaluate_cached(
        &self,
        input: &EvaluationInput,
    ) -> Result<EvaluationOutcome, TribunalError> {
        input.validate()?;
        let lookup = self
            .history
            .find_duplicate(&input.user_prompt, &input.ai_response);
        if let Some(entry) = lookup.entry {
            tracing::debug!(entry_id = %entry.id, "replaying cached evaluation");
            return Ok(replay(entry));
        }
        self.evaluate_with_all_enabled(input).await
    }

    pub fn find_duplicate(&self, input: &EvaluationInput) -> tribunal_core::DuplicateLookup {
        self.history
            .find_duplicate(&input.user_prompt, &input.ai_response)
    }

    pub fn annotate_feedback(&self, entry_id: &str, feedback: &str) {
        self.history.annotate_feedback(entry_id, feedback);
    }

    async fn evaluate_one(
        &self,
        input: &EvaluationInput,
        id: &str,
    ) -> Result<EvaluationResult, TribunalError> {
        let instance = self
            .registry
            .get_by_id(id)
            .ok_or_else(|| TribunalError::InstanceNotFound(id.to_string()))?;
        if !instance.enabled || !instance.is_configured() {
            return Err(TribunalError::InstanceDisabled(id.to_string()));
        }

        let adapter = self.adapter_for(&instance).await?;
        let result = match self.timeout {
            Some(deadline) => tokio::time::timeout(deadline, adapter.evaluate(input))
                .await
                .map_err(|_| {
                    TribunalError::Timeout(format!(
                        "instance '{id}' exceeded {}ms",
                        deadline.as_millis()
                    ))
                })??,
            None => adapter.evaluate(input).await?,
        };

        validator::validate(&result)?;
        Ok(result)
    }

    /// Warm adapter per instance id; rebuilt when the instance's
    /// configuration has changed since the cached adapter was constructed.
    async fn adapter_for(
        &self,
        instance: &ProviderInstance,
    ) -> Result<Arc<dyn ProviderAdapter>, TribunalError> {
        let mut adapters = self.adapters.lock().await;
        if let Some(cached) = adapters.get(&instance.id) {
            if &cached.instance == instance {
                return Ok(cached.adapter.clone());
            }
        }
        let adapter = self.factory.build(instance)?;
        adapters.insert(
            instance.id.clone(),
            CachedAdapter {
                instance: instance.clone(),
                adapter: adapter.clone(),
            },
        );
        Ok(adapter)
    }
}

/// Rebuild an outcome from a stored history entry.
fn replay(entry: tribunal_core::HistoryEntry) -> EvaluationOutcome {
    let results = entry.evaluation.instance_results.clone();
    let combined = match (
        entry.evaluation.combined_metrics,
        entry.evaluation.combined_feedback.clone(),
    ) {
        (Some(metrics), Some(feedback)) => CombinedResult { metrics, feedback },
        _ => {
            let collected: Vec<EvaluationResult> =
                results.iter().map(|(_, r)| r.clone()).collect();
            aggregate::combine(&collected)
        }
    };
    EvaluationOutcome {
        entry_id: entry.id,
        results,
        combined,
        failures: Vec::new(),
    }
}

fn generate_run_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("run-{}-{}", now_ms(), &suffix[..8])
}
