//! Provider implementations and the registry the API serves from.

pub mod openai;

pub use openai::OpenAiProvider;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use lumen_core::error::{LumenError, Result};
use lumen_core::provider::{LlmProvider, ProviderConfig};

/// Known provider ids, in listing order.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "groq", "gemini", "ollama"];

/// Resolve an API key for a provider from the environment.
/// Local providers need no key.
pub fn resolve_api_key(provider: &str) -> Option<String> {
    let env_vars: &[&str] = match provider {
        "openai" => &["OPENAI_API_KEY"],
        "openrouter" => &["OPENROUTER_API_KEY"],
        "groq" => &["GROQ_API_KEY"],
        "gemini" => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        "ollama" | "lmstudio" => return Some("local".to_string()),
        _ => &[],
    };

    for var in env_vars {
        if let Ok(val) = std::env::var(var) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }

    None
}

/// Default model per provider.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "openai" => "gpt-4o-mini",
        "openrouter" => "openai/gpt-4o-mini",
        "groq" => "llama-3.3-70b-versatile",
        "gemini" => "gemini-2.5-flash",
        "ollama" => "llama3.2",
        _ => "gpt-4o-mini",
    }
}

/// Build a provider instance by id.
pub fn create_provider(provider: &str, api_key: Option<String>, model: &str) -> OpenAiProvider {
    match provider {
        "ollama" => OpenAiProvider::ollama(model),
        "openrouter" => OpenAiProvider::openrouter(api_key, model),
        "gemini" => OpenAiProvider::gemini(api_key, model),
        "groq" => OpenAiProvider::groq(api_key, model),
        _ => OpenAiProvider::openai(api_key, model),
    }
}

/// Listing entry for the providers endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub id: String,
    pub default_model: String,
    pub enabled: bool,
}

/// Registry of configured providers, keyed by id.
///
/// Built once at startup; shared immutably across requests. A provider is
/// present whether or not it is enabled — the enabled check happens per
/// request so the error can say *which* provider lacks configuration.
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    /// Registry of all known providers, keys resolved from the environment.
    pub fn from_env() -> Self {
        let mut providers: BTreeMap<String, Arc<dyn LlmProvider>> = BTreeMap::new();
        for id in KNOWN_PROVIDERS {
            let key = resolve_api_key(id);
            let provider = create_provider(id, key, default_model(id));
            providers.insert((*id).to_string(), Arc::new(provider));
        }
        Self { providers }
    }

    /// Registry with a single pre-built provider (tests, custom setups).
    pub fn single(id: &str, provider: Arc<dyn LlmProvider>) -> Self {
        let mut providers: BTreeMap<String, Arc<dyn LlmProvider>> = BTreeMap::new();
        providers.insert(id.to_string(), provider);
        Self { providers }
    }

    /// Register or replace a provider under an id.
    pub fn insert(&mut self, id: &str, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(id.to_string(), provider);
    }

    /// Look up a provider, erroring on unknown ids.
    pub fn get(&self, id: &str) -> Result<Arc<dyn LlmProvider>> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| LumenError::Validation(format!("unknown provider '{}'", id)))
    }

    /// Listing for the providers endpoint.
    pub fn list(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|(id, p)| ProviderInfo {
                id: id.clone(),
                default_model: p.default_model().to_string(),
                enabled: p.is_enabled(),
            })
            .collect()
    }
}

/// Provider built from an explicit config (CLI override path).
pub fn from_config(config: &ProviderConfig) -> OpenAiProvider {
    let mut config = config.clone();
    if config.api_key.is_none() {
        config.api_key = resolve_api_key(&config.provider);
    }
    if config.api_base.is_none() {
        // Reuse the per-provider endpoint defaults.
        return create_provider(&config.provider, config.api_key.clone(), &config.model);
    }
    OpenAiProvider::new(config)
}
