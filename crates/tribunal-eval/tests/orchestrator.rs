use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tribunal_core::{
    EvaluationFeedback, EvaluationInput, EvaluationMetrics, EvaluationResult, EvaluationStatus,
    FailureSink, ProviderAdapter, ResultMetadata, TribunalError,
};
use tribunal_eval::{EvaluationHistory, Orchestrator};
use tribunal_providers::{AdapterFactory, FakeBackend, ScriptedAdapter};
use tribunal_registry::{
    InMemoryConfigStore, InstanceConfig, InstanceRegistry, InstanceUpdate, ProviderInstance,
    ProviderKind,
};

fn make_result(provider_id: &str, overall: i64) -> EvaluationResult {
    EvaluationResult {
        metrics: EvaluationMetrics {
            relevance: overall,
            accuracy: overall,
            completeness: overall,
            coherence: overall,
            overall,
        },
        feedback: EvaluationFeedback {
            strengths: vec![format!("strength from {provider_id}")],
            weaknesses: vec![format!("weakness from {provider_id}")],
            suggestions: vec![],
            summary: format!("summary from {provider_id}"),
            prompt_request_suggestion: format!("suggestion from {provider_id}"),
            references: vec![],
        },
        metadata: ResultMetadata {
            provider_id: provider_id.to_string(),
            timestamp: 1_700_000_000_000,
            processing_time_ms: 10,
            model_version: None,
        },
    }
}

fn inst(id: &str, kind: ProviderKind) -> ProviderInstance {
    ProviderInstance::new(id, kind, id, InstanceConfig::new("key", "model"))
}

fn input() -> EvaluationInput {
    EvaluationInput::new("p", "r")
}

/// Orchestrator whose factory resolves instance ids through a fixed adapter
/// table; ids not in the table get an exhausted scripted adapter.
fn build(
    instances: Vec<ProviderInstance>,
    adapters: Vec<Arc<ScriptedAdapter>>,
) -> Orchestrator {
    let store = Arc::new(InMemoryConfigStore::new());
    let registry = Arc::new(InstanceRegistry::new(store.clone()).unwrap());
    for instance in instances {
        registry.add(instance).unwrap();
    }

    let factory = AdapterFactory::new(Arc::new(FakeBackend::new()));
    let table: Arc<HashMap<String, Arc<ScriptedAdapter>>> = Arc::new(
        adapters
            .into_iter()
            .map(|a| (a.instance_id().to_string(), a))
            .collect(),
    );
    for kind in ProviderKind::ALL {
        let table = table.clone();
        factory.register(
            kind,
            Arc::new(move |instance, _backend| match table.get(&instance.id) {
                Some(adapter) => adapter.clone() as Arc<dyn ProviderAdapter>,
                None => Arc::new(ScriptedAdapter::new(instance.id, vec![])),
            }),
        );
    }

    let history = Arc::new(EvaluationHistory::new(store).unwrap());
    Orchestrator::new(registry, factory, history)
}

struct CountingSink(Mutex<Vec<(String, String)>>);

impl CountingSink {
    fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    fn recorded(&self) -> Vec<(String, String)> {
        self.0.lock().unwrap().clone()
    }
}

impl FailureSink for CountingSink {
    fn on_failure(&self, instance_id: &str, error: &TribunalError) {
        self.0
            .lock()
            .unwrap()
            .push((instance_id.to_string(), error.to_string()));
    }
}

struct PendingAdapter {
    id: String,
}

#[async_trait]
impl ProviderAdapter for PendingAdapter {
    fn instance_id(&self) -> &str {
        &self.id
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn evaluate(&self, _input: &EvaluationInput) -> Result<EvaluationResult, TribunalError> {
        futures::future::pending().await
    }
}

#[tokio::test]
async fn all_enabled_combines_results() {
    let o1 = Arc::new(ScriptedAdapter::new("o1", vec![Ok(make_result("o1", 80))]));
    let c1 = Arc::new(ScriptedAdapter::new("c1", vec![Ok(make_result("c1", 90))]));
    let orchestrator = build(
        vec![
            inst("o1", ProviderKind::OpenAi),
            inst("c1", ProviderKind::Anthropic),
        ],
        vec![o1.clone(), c1.clone()],
    );

    let outcome = orchestrator.evaluate_with_all_enabled(&input()).await.unwrap();
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.combined.metrics.overall, 85);
    assert!(outcome.failures.is_empty());
    assert_eq!(o1.call_count(), 1);
    assert_eq!(c1.call_count(), 1);
}

#[tokio::test]
async fn empty_instance_list_rejects_before_dispatch() {
    let o1 = Arc::new(ScriptedAdapter::new("o1", vec![Ok(make_result("o1", 80))]));
    let orchestrator = build(vec![inst("o1", ProviderKind::OpenAi)], vec![o1.clone()]);

    let err = orchestrator
        .evaluate_with_instances(&input(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, TribunalError::Validation(_)));
    assert_eq!(o1.call_count(), 0);
}

#[tokio::test]
async fn blank_input_rejects_before_dispatch() {
    let o1 = Arc::new(ScriptedAdapter::new("o1", vec![Ok(make_result("o1", 80))]));
    let orchestrator = build(vec![inst("o1", ProviderKind::OpenAi)], vec![o1.clone()]);

    let err = orchestrator
        .evaluate_with_instances(&EvaluationInput::new("", "r"), &["o1".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, TribunalError::Validation(_)));
    assert_eq!(o1.call_count(), 0);
}

#[tokio::test]
async fn partial_failure_keeps_surviving_results() {
    let a = Arc::new(ScriptedAdapter::new("a", vec![Ok(make_result("a", 70))]));
    let b = Arc::new(ScriptedAdapter::new(
        "b",
        vec![Err(TribunalError::ProviderHttp {
            status: 500,
            message: "boom".to_string(),
        })],
    ));
    let c = Arc::new(ScriptedAdapter::new("c", vec![Ok(make_result("c", 90))]));
    let sink = Arc::new(CountingSink::new());
    let orchestrator = build(
        vec![
            inst("a", ProviderKind::OpenAi),
            inst("b", ProviderKind::OpenAi),
            inst("c", ProviderKind::OpenAi),
        ],
        vec![a, b, c],
    )
    .with_failure_sink(sink.clone());

    let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let outcome = orchestrator.evaluate_with_instances(&input(), &ids).await.unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.result_for("a").is_some());
    assert!(outcome.result_for("c").is_some());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "b");

    let recorded = sink.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "b");
    assert!(recorded[0].1.contains("boom"));
}

#[tokio::test]
async fn all_failures_reject_with_joined_reasons() {
    let a = Arc::new(ScriptedAdapter::new(
        "a",
        vec![Err(TribunalError::EmptyResponse("nothing from a".to_string()))],
    ));
    let b = Arc::new(ScriptedAdapter::new(
        "b",
        vec![Err(TribunalError::MalformedResponse("garbage from b".to_string()))],
    ));
    let orchestrator = build(
        vec![inst("a", ProviderKind::OpenAi), inst("b", ProviderKind::OpenAi)],
        vec![a, b],
    );

    let ids: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
    let err = orchestrator.evaluate_with_instances(&input(), &ids).await.unwrap_err();
    match err {
        TribunalError::AllInstancesFailed(message) => {
            assert!(message.contains("a: "));
            assert!(message.contains("nothing from a"));
            assert!(message.contains("b: "));
            assert!(message.contains("garbage from b"));
        }
        other => panic!("expected AllInstancesFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_and_disabled_ids_are_per_instance_failures() {
    let a = Arc::new(ScriptedAdapter::new("a", vec![Ok(make_result("a", 80))]));
    let orchestrator = build(
        vec![
            inst("a", ProviderKind::OpenAi),
            inst("off", ProviderKind::OpenAi).disabled(),
        ],
        vec![a],
    );

    let ids: Vec<String> = ["a", "off", "ghost"].iter().map(|s| s.to_string()).collect();
    let outcome = orchestrator.evaluate_with_instances(&input(), &ids).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.failures.len(), 2);
    let failed: Vec<&str> = outcome.failures.iter().map(|(id, _)| id.as_str()).collect();
    assert!(failed.contains(&"off"));
    assert!(failed.contains(&"ghost"));
}

#[tokio::test]
async fn invalid_provider_output_is_a_per_instance_failure() {
    let mut bad = make_result("bad", 80);
    bad.metrics.relevance = 101;
    let a = Arc::new(ScriptedAdapter::new("a", vec![Ok(make_result("a", 80))]));
    let b = Arc::new(ScriptedAdapter::new("bad", vec![Ok(bad)]));
    let orchestrator = build(
        vec![inst("a", ProviderKind::OpenAi), inst("bad", ProviderKind::OpenAi)],
        vec![a, b],
    );

    let ids: Vec<String> = ["a", "bad"].iter().map(|s| s.to_string()).collect();
    let outcome = orchestrator.evaluate_with_instances(&input(), &ids).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].1.contains("between 0 and 100"));
}

#[tokio::test]
async fn no_enabled_instances_rejects_before_dispatch() {
    let orchestrator = build(vec![inst("off", ProviderKind::OpenAi).disabled()], vec![]);

    let err = orchestrator.evaluate_with_all_enabled(&input()).await.unwrap_err();
    assert!(matches!(err, TribunalError::NoEnabledInstances));
}

#[tokio::test]
async fn results_keep_requested_order() {
    let a = Arc::new(ScriptedAdapter::new("a", vec![Ok(make_result("a", 80))]));
    let b = Arc::new(ScriptedAdapter::new("b", vec![Ok(make_result("b", 90))]));
    let orchestrator = build(
        vec![inst("a", ProviderKind::OpenAi), inst("b", ProviderKind::OpenAi)],
        vec![a, b],
    );

    let ids: Vec<String> = ["b", "a"].iter().map(|s| s.to_string()).collect();
    let outcome = orchestrator.evaluate_with_instances(&input(), &ids).await.unwrap();
    let order: Vec<&str> = outcome.results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["b", "a"]);
}

#[tokio::test]
async fn outcome_is_recorded_in_history() {
    let a = Arc::new(ScriptedAdapter::new("a", vec![Ok(make_result("a", 80))]));
    let b = Arc::new(ScriptedAdapter::new(
        "b",
        vec![Err(TribunalError::EmptyResponse("no".to_string()))],
    ));
    let orchestrator = build(
        vec![inst("a", ProviderKind::OpenAi), inst("b", ProviderKind::OpenAi)],
        vec![a, b],
    );

    let ids: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
    let outcome = orchestrator.evaluate_with_instances(&input(), &ids).await.unwrap();

    let entry = orchestrator.history().get(&outcome.entry_id).unwrap();
    assert_eq!(entry.user_input, "p");
    assert_eq!(entry.evaluation.status, EvaluationStatus::Partial);
    assert_eq!(entry.evaluation.instance_results.len(), 1);
    assert!(entry.evaluation.result_for("a").is_some());
    assert_eq!(
        entry.evaluation.combined_metrics.unwrap().overall,
        outcome.combined.metrics.overall
    );
}

#[tokio::test]
async fn cached_entry_point_replays_without_dispatch() {
    let a = Arc::new(ScriptedAdapter::new(
        "a",
        vec![Ok(make_result("a", 80)), Ok(make_result("a", 90))],
    ));
    let orchestrator = build(vec![inst("a", ProviderKind::OpenAi)], vec![a.clone()]);

    let first = orchestrator.evaluate_cached(&input()).await.unwrap();
    assert_eq!(a.call_count(), 1);

    let second = orchestrator.evaluate_cached(&input()).await.unwrap();
    assert_eq!(a.call_count(), 1, "cache hit must not dispatch");
    assert_eq!(second.entry_id, first.entry_id);
    assert_eq!(second.combined.metrics.overall, 80);
}

#[tokio::test]
async fn annotate_feedback_round_trips() {
    let a = Arc::new(ScriptedAdapter::new("a", vec![Ok(make_result("a", 80))]));
    let orchestrator = build(vec![inst("a", ProviderKind::OpenAi)], vec![a]);

    let outcome = orchestrator.evaluate_with_all_enabled(&input()).await.unwrap();
    orchestrator.annotate_feedback(&outcome.entry_id, "spot on");

    let entry = orchestrator.history().get(&outcome.entry_id).unwrap();
    assert_eq!(entry.user_feedback.as_deref(), Some("spot on"));
}

#[tokio::test]
async fn adapters_are_cached_until_config_changes() {
    let store = Arc::new(InMemoryConfigStore::new());
    let registry = Arc::new(InstanceRegistry::new(store.clone()).unwrap());
    registry.add(inst("a", ProviderKind::OpenAi)).unwrap();

    let ctor_calls = Arc::new(AtomicUsize::new(0));
    let adapter = Arc::new(ScriptedAdapter::new(
        "a",
        vec![
            Ok(make_result("a", 80)),
            Ok(make_result("a", 80)),
            Ok(make_result("a", 80)),
        ],
    ));
    let factory = AdapterFactory::new(Arc::new(FakeBackend::new()));
    {
        let ctor_calls = ctor_calls.clone();
        let adapter = adapter.clone();
        factory.register(
            ProviderKind::OpenAi,
            Arc::new(move |_instance, _backend| {
                ctor_calls.fetch_add(1, Ordering::SeqCst);
                adapter.clone() as Arc<dyn ProviderAdapter>
            }),
        );
    }
    let history = Arc::new(EvaluationHistory::new(store).unwrap());
    let orchestrator = Orchestrator::new(registry.clone(), factory, history);

    orchestrator.evaluate_with_all_enabled(&input()).await.unwrap();
    orchestrator.evaluate_with_all_enabled(&input()).await.unwrap();
    assert_eq!(ctor_calls.load(Ordering::SeqCst), 1, "warm adapter reused");

    registry
        .update("a", InstanceUpdate::set_config(InstanceConfig::new("new-key", "model")))
        .unwrap();
    orchestrator.evaluate_with_all_enabled(&input()).await.unwrap();
    assert_eq!(ctor_calls.load(Ordering::SeqCst), 2, "rebuilt after update");
}

#[tokio::test]
async fn timed_out_instance_fails_like_any_other() {
    let store = Arc::new(InMemoryConfigStore::new());
    let registry = Arc::new(InstanceRegistry::new(store.clone()).unwrap());
    registry.add(inst("slow", ProviderKind::OpenAi)).unwrap();
    registry.add(inst("fast", ProviderKind::Anthropic)).unwrap();

    let fast = Arc::new(ScriptedAdapter::new("fast", vec![Ok(make_result("fast", 90))]));
    let factory = AdapterFactory::new(Arc::new(FakeBackend::new()));
    factory.register(
        ProviderKind::OpenAi,
        Arc::new(|instance, _backend| {
            Arc::new(PendingAdapter { id: instance.id }) as Arc<dyn ProviderAdapter>
        }),
    );
    {
        let fast = fast.clone();
        factory.register(
            ProviderKind::Anthropic,
            Arc::new(move |_instance, _backend| fast.clone() as Arc<dyn ProviderAdapter>),
        );
    }
    let history = Arc::new(EvaluationHistory::new(store).unwrap());
    let orchestrator = Orchestrator::new(registry, factory, history)
        .with_timeout(Duration::from_millis(20));

    let ids: Vec<String> = ["slow", "fast"].iter().map(|s| s.to_string()).collect();
    let outcome = orchestrator.evaluate_with_instances(&input(), &ids).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.result_for("fast").is_some());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "slow");
    assert!(outcome.failures[0].1.contains("timeout"));
}
