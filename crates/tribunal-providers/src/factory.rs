use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tribunal_core::{ProviderAdapter, TribunalError};
use tribunal_registry::{ProviderInstance, ProviderKind};

use crate::anthropic::AnthropicAdapter;
use crate::backend::{HttpBackend, ProviderBackend};
use crate::gemini::GeminiAdapter;
use crate::ollama::OllamaAdapter;
use crate::openai::OpenAiAdapter;

pub type AdapterCtor =
    Arc<dyn Fn(ProviderInstance, Arc<dyn ProviderBackend>) -> Arc<dyn ProviderAdapter> + Send + Sync>;

/// Vendor dispatch table. New vendor families plug in through `register`;
/// nothing downstream special-cases vendor identity.
pub struct AdapterFactory {
    backend: Arc<dyn ProviderBackend>,
    ctors: RwLock<HashMap<ProviderKind, AdapterCtor>>,
}

impl AdapterFactory {
    /// Factory over the given transport, pre-seeded with the built-in
    /// vendor families.
    pub fn new(backend: Arc<dyn ProviderBackend>) -> Self {
        let mut ctors: HashMap<ProviderKind, AdapterCtor> = HashMap::new();
        ctors.insert(
            ProviderKind::OpenAi,
            Arc::new(|instance, backend| Arc::new(OpenAiAdapter::new(instance, backend))),
        );
        ctors.insert(
            ProviderKind::Anthropic,
            Arc::new(|instance, backend| Arc::new(AnthropicAdapter::new(instance, backend))),
        );
        ctors.insert(
            ProviderKind::Gemini,
            Arc::new(|instance, backend| Arc::new(GeminiAdapter::new(instance, backend))),
        );
        ctors.insert(
            ProviderKind::Ollama,
            Arc::new(|instance, backend| Arc::new(OllamaAdapter::new(instance, backend))),
        );
        Self {
            backend,
            ctors: RwLock::new(ctors),
        }
    }

    /// Factory over a real reqwest transport.
    pub fn http() -> Self {
        Self::new(Arc::new(HttpBackend::new()))
    }

    pub fn backend(&self) -> Arc<dyn ProviderBackend> {
        self.backend.clone()
    }

    /// Register (or replace) the constructor for a vendor family.
    pub fn register(&self, kind: ProviderKind, ctor: AdapterCtor) {
        self.ctors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, ctor);
    }

    pub fn build(
        &self,
        instance: &ProviderInstance,
    ) -> Result<Arc<dyn ProviderAdapter>, TribunalError> {
        let ctor = self
            .ctors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&instance.kind)
            .cloned()
            .ok_or_else(|| TribunalError::UnknownTemplate(instance.kind.to_string()))?;
        Ok(ctor(instance.clone(), self.backend.clone()))
    }
}
