mod anthropic;
mod backend;
mod extract;
mod factory;
mod gemini;
mod ollama;
mod openai;
mod prompt;
mod scripted;
mod verdict;

pub use anthropic::AnthropicAdapter;
pub use backend::{FakeBackend, HttpBackend, ProviderBackend, ProviderRequest, ProviderResponse};
pub use extract::extract_json;
pub use factory::{AdapterCtor, AdapterFactory};
pub use gemini::GeminiAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;
pub use prompt::{build_evaluation_prompt, SYSTEM_INSTRUCTION};
pub use scripted::ScriptedAdapter;
