mod instance;
mod memory;
mod registry;
mod templates;

pub use instance::{InstanceConfig, InstanceUpdate, ProviderInstance, ProviderKind};
pub use memory::InMemoryConfigStore;
pub use registry::{InstanceRegistry, INSTANCES_KEY};
pub use templates::{ModelEntry, ProviderTemplate, TemplateCatalog};
