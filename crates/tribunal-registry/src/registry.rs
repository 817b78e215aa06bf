use std::sync::{Arc, RwLock};

use tribunal_core::{now_ms, ConfigStore, TribunalError};
use uuid::Uuid;

use crate::instance::{InstanceUpdate, ProviderInstance, ProviderKind};
use crate::templates::TemplateCatalog;

/// Store key under which the full instance list is persisted.
pub const INSTANCES_KEY: &str = "tribunal.instances";

/// Owns every provider instance. All mutating methods complete their
/// read-modify-write-persist sequence synchronously, so a concurrent caller
/// can never observe (or persist) a half-applied mutation.
pub struct InstanceRegistry {
    store: Arc<dyn ConfigStore>,
    catalog: TemplateCatalog,
    instances: RwLock<Vec<ProviderInstance>>,
}

impl std::fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instances", &self.instances)
            .finish_non_exhaustive()
    }
}

impl InstanceRegistry {
    /// Load the persisted instance list from the store, or start empty when
    /// nothing was persisted yet.
    pub fn new(store: Arc<dyn ConfigStore>) -> Result<Self, TribunalError> {
        Self::with_catalog(store, TemplateCatalog::new())
    }

    pub fn with_catalog(
        store: Arc<dyn ConfigStore>,
        catalog: TemplateCatalog,
    ) -> Result<Self, TribunalError> {
        let instances = match store.get(INSTANCES_KEY) {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| TribunalError::Store(format!("corrupt instance snapshot: {e}")))?,
            None => Vec::new(),
        };
        Ok(Self {
            store,
            catalog,
            instances: RwLock::new(instances),
        })
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn add(&self, instance: ProviderInstance) -> Result<(), TribunalError> {
        let mut instances = self.instances.write().unwrap_or_else(|e| e.into_inner());
        if instances.iter().any(|i| i.id == instance.id) {
            return Err(TribunalError::DuplicateId(instance.id));
        }
        tracing::info!(id = %instance.id, kind = %instance.kind, name = %instance.name, "instance added");
        instances.push(instance);
        self.persist(&instances);
        Ok(())
    }

    /// Idempotent: removing an absent id is not an error.
    pub fn remove(&self, id: &str) {
        let mut instances = self.instances.write().unwrap_or_else(|e| e.into_inner());
        let before = instances.len();
        instances.retain(|i| i.id != id);
        if instances.len() != before {
            tracing::info!(id = %id, "instance removed");
            self.persist(&instances);
        }
    }

    /// Merge a partial update into an existing instance. The id is never
    /// overwritten.
    pub fn update(&self, id: &str, update: InstanceUpdate) -> Result<ProviderInstance, TribunalError> {
        let mut instances = self.instances.write().unwrap_or_else(|e| e.into_inner());
        let instance = instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| TribunalError::NotFound(id.to_string()))?;
        if let Some(name) = update.name {
            instance.name = name;
        }
        if let Some(enabled) = update.enabled {
            instance.enabled = enabled;
        }
        if let Some(config) = update.config {
            instance.config = config;
        }
        let updated = instance.clone();
        tracing::info!(id = %id, "instance updated");
        self.persist(&instances);
        Ok(updated)
    }

    pub fn get_by_id(&self, id: &str) -> Option<ProviderInstance> {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    /// Instances that are enabled and carry a usable API key.
    pub fn get_enabled(&self) -> Vec<ProviderInstance> {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|i| i.enabled && i.is_configured())
            .cloned()
            .collect()
    }

    pub fn get_by_kind(&self, kind: ProviderKind) -> Vec<ProviderInstance> {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|i| i.kind == kind)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<ProviderInstance> {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a new instance from the template registered for `kind`. The
    /// instance is returned, not inserted; pass it to `add` to register it.
    pub fn create_default(
        &self,
        kind: ProviderKind,
        name: Option<&str>,
    ) -> Result<ProviderInstance, TribunalError> {
        let template = self
            .catalog
            .get(kind)
            .ok_or_else(|| TribunalError::UnknownTemplate(kind.to_string()))?;
        let base_name = name.unwrap_or(&template.display_name);
        let unique_name = self.generate_unique_name(base_name);
        Ok(ProviderInstance::new(
            generate_instance_id(kind),
            kind,
            unique_name,
            template.default_config(),
        ))
    }

    /// Append an incrementing suffix until the name is unused: "OpenAI",
    /// then "OpenAI 2", "OpenAI 3", ...
    pub fn generate_unique_name(&self, base_name: &str) -> String {
        let instances = self.instances.read().unwrap_or_else(|e| e.into_inner());
        let taken = |candidate: &str| instances.iter().any(|i| i.name == candidate);
        if !taken(base_name) {
            return base_name.to_string();
        }
        let mut n = 2u32;
        loop {
            let candidate = format!("{base_name} {n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn persist(&self, instances: &[ProviderInstance]) {
        match serde_json::to_string(instances) {
            Ok(raw) => self.store.set(INSTANCES_KEY, raw),
            Err(e) => tracing::error!(error = %e, "failed to serialize instance snapshot"),
        }
    }
}

/// `{kind}-{epoch_ms}-{random}`, unique per insertion.
fn generate_instance_id(kind: ProviderKind) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", kind, now_ms(), &suffix[..8])
}
