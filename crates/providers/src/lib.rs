//! LLM provider implementations for namecard.
//!
//! The assistant only needs one capability from a backend: a streaming chat
//! completion with tool calling. `OpenAiCompatProvider` covers the vast
//! majority of hosted and local backends (OpenAI, OpenRouter, vLLM, Ollama,
//! DeepSeek, Moonshot, …) since they all expose the same
//! `/chat/completions` wire format.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use namecard_core::error::{Error, ProviderError};
use namecard_core::provider::Provider;
use std::sync::Arc;

/// Build the configured provider.
pub fn build_provider(config: &namecard_config::AppConfig) -> Result<Arc<dyn Provider>, Error> {
    let api_key = config
        .provider
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("No API key set — export NAMECARD_API_KEY".into()))?;

    Ok(Arc::new(OpenAiCompatProvider::new(
        "openai-compat",
        config.provider.base_url.clone(),
        api_key,
    )))
}
