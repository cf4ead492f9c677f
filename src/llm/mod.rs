//! Language-model integration.
//!
//! The chat and extraction bridges talk to an `LlmProvider`. The only concrete
//! backend is Google Gemini, called directly over HTTPS with `reqwest`.

pub mod gemini;
pub mod provider;

pub use gemini::GeminiProvider;
pub use provider::*;

use std::sync::Arc;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Override for the API root; `None` uses the public endpoint.
    pub base_url: Option<String>,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    let mut provider = GeminiProvider::new(config.api_key.clone(), &config.model);
    if let Some(ref base_url) = config.base_url {
        provider = provider.with_base_url(base_url);
    }
    tracing::info!("Using Gemini (model: {})", config.model);
    Arc::new(provider)
}
