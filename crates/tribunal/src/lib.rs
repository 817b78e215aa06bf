//! Tribunal: multi-provider LLM response evaluation.
//!
//! This crate re-exports the Tribunal sub-crates for convenient single-import
//! usage.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use tribunal::core::EvaluationInput;
//! use tribunal::eval::{EvaluationHistory, Orchestrator};
//! use tribunal::providers::{AdapterFactory, HttpBackend};
//! use tribunal::registry::{InMemoryConfigStore, InstanceRegistry, ProviderKind};
//!
//! # async fn run() -> Result<(), tribunal::core::TribunalError> {
//! let store = Arc::new(InMemoryConfigStore::new());
//! let registry = Arc::new(InstanceRegistry::new(store.clone())?);
//! let instance = registry.create_default(ProviderKind::OpenAi, None)?;
//! registry.add(instance)?;
//!
//! let factory = AdapterFactory::new(Arc::new(HttpBackend::new()));
//! let history = Arc::new(EvaluationHistory::new(store)?);
//! let orchestrator = Orchestrator::new(registry, factory, history);
//!
//! let input = EvaluationInput::new("What is DNS?", "DNS maps names to addresses.");
//! let outcome = orchestrator.evaluate_cached(&input).await?;
//! println!("overall: {}", outcome.combined.metrics.overall);
//! # Ok(())
//! # }
//! ```

/// Core types and traits: evaluation data model, TribunalError, ProviderAdapter,
/// ConfigStore, FailureSink.
pub use tribunal_core as core;

/// Provider instance registry: ProviderKind, ProviderInstance, templates,
/// persistence through a ConfigStore.
#[cfg(feature = "registry")]
pub use tribunal_registry as registry;

/// Provider adapters: OpenAI, Anthropic, Gemini, Ollama, the transport seam,
/// the adapter factory, and test doubles.
#[cfg(feature = "providers")]
pub use tribunal_providers as providers;

/// Evaluation engine: result validation, aggregation, orchestration, history.
#[cfg(feature = "eval")]
pub use tribunal_eval as eval;
