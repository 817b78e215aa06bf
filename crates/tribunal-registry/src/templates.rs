use std::collections::HashMap;
use std::sync::RwLock;

use crate::instance::{InstanceConfig, ProviderKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    pub default: bool,
}

impl ModelEntry {
    fn new(id: &str, name: &str, default: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            default,
        }
    }
}

/// Static defaults for one vendor family, used when instantiating a new
/// instance via `InstanceRegistry::create_default`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTemplate {
    pub kind: ProviderKind,
    pub display_name: String,
    pub models: Vec<ModelEntry>,
    pub default_endpoint: String,
    pub default_temperature: f64,
    pub default_max_tokens: u32,
    /// API key pre-filled for vendors that need none (local daemons).
    pub placeholder_api_key: Option<String>,
}

impl ProviderTemplate {
    pub fn default_model(&self) -> &ModelEntry {
        self.models
            .iter()
            .find(|m| m.default)
            .unwrap_or(&self.models[0])
    }

    /// Instance config with this template's defaults filled in.
    pub fn default_config(&self) -> InstanceConfig {
        InstanceConfig {
            api_key: self.placeholder_api_key.clone().unwrap_or_default(),
            model: self.default_model().id.clone(),
            endpoint: Some(self.default_endpoint.clone()),
            temperature: Some(self.default_temperature),
            max_tokens: Some(self.default_max_tokens),
            custom_headers: Vec::new(),
        }
    }
}

fn builtin(kind: ProviderKind) -> ProviderTemplate {
    match kind {
        ProviderKind::OpenAi => ProviderTemplate {
            kind,
            display_name: "OpenAI".to_string(),
            models: vec![
                ModelEntry::new("gpt-4o", "GPT-4o", true),
                ModelEntry::new("gpt-4o-mini", "GPT-4o mini", false),
                ModelEntry::new("gpt-4.1", "GPT-4.1", false),
            ],
            default_endpoint: "https://api.openai.com/v1".to_string(),
            default_temperature: 0.3,
            default_max_tokens: 2048,
            placeholder_api_key: None,
        },
        ProviderKind::Anthropic => ProviderTemplate {
            kind,
            display_name: "Claude".to_string(),
            models: vec![
                ModelEntry::new("claude-sonnet-4-20250514", "Claude Sonnet 4", true),
                ModelEntry::new("claude-3-5-haiku-20241022", "Claude 3.5 Haiku", false),
            ],
            default_endpoint: "https://api.anthropic.com".to_string(),
            default_temperature: 0.3,
            default_max_tokens: 2048,
            placeholder_api_key: None,
        },
        ProviderKind::Gemini => ProviderTemplate {
            kind,
            display_name: "Gemini".to_string(),
            models: vec![
                ModelEntry::new("gemini-2.0-flash", "Gemini 2.0 Flash", true),
                ModelEntry::new("gemini-1.5-pro", "Gemini 1.5 Pro", false),
            ],
            default_endpoint: "https://generativelanguage.googleapis.com".to_string(),
            default_temperature: 0.3,
            default_max_tokens: 2048,
            placeholder_api_key: None,
        },
        ProviderKind::Ollama => ProviderTemplate {
            kind,
            display_name: "Ollama".to_string(),
            models: vec![
                ModelEntry::new("llama3.1", "Llama 3.1", true),
                ModelEntry::new("mistral", "Mistral", false),
            ],
            default_endpoint: "http://localhost:11434".to_string(),
            default_temperature: 0.3,
            default_max_tokens: 2048,
            // the local daemon needs no key, but an empty key would make the
            // instance count as unconfigured
            placeholder_api_key: Some("local".to_string()),
        },
    }
}

/// Template lookup table, pre-seeded with the built-in vendor families and
/// extensible through `register`.
pub struct TemplateCatalog {
    templates: RwLock<HashMap<ProviderKind, ProviderTemplate>>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        for kind in ProviderKind::ALL {
            templates.insert(kind, builtin(kind));
        }
        Self {
            templates: RwLock::new(templates),
        }
    }

    /// Catalog with no built-ins, for tests exercising the unknown-template
    /// path.
    pub fn empty() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, template: ProviderTemplate) {
        self.templates
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(template.kind, template);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<ProviderTemplate> {
        self.templates
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .cloned()
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::new()
    }
}
