//! Provider factory — builds the configured provider.
//!
//! Every supported backend speaks the OpenAI chat-completions protocol, so
//! the factory only has to pick a base URL and HTTP settings.

use std::sync::Arc;
use std::time::Duration;

use patternkit_config::AppConfig;
use patternkit_core::error::{Error, ProviderError, Result};
use patternkit_core::provider::Provider;

use crate::openai_compat::{HttpSettings, OpenAiCompatProvider};

/// Build the provider described by `config`.
///
/// Fails with a configuration error when no API key is available or the
/// provider has neither a well-known endpoint nor an `api_url`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>> {
    let api_key = config.require_api_key()?;

    let base_url = match &config.api_url {
        Some(url) => url.clone(),
        None => default_base_url(&config.provider)
            .ok_or_else(|| Error::Config {
                message: format!(
                    "unknown provider '{}' (set api_url for custom endpoints)",
                    config.provider
                ),
            })?
            .to_string(),
    };

    let settings = HttpSettings {
        timeout: Duration::from_secs(config.request_timeout_secs),
        accept_invalid_certs: config.accept_invalid_certs,
    };

    tracing::debug!(provider = %config.provider, %base_url, "Building provider");
    let provider = OpenAiCompatProvider::new(&config.provider, base_url, api_key, &settings)
        .map_err(setup_error)?;
    Ok(Arc::new(provider))
}

/// A provider that cannot be constructed is a local settings problem, not an
/// unavailable service.
fn setup_error(err: ProviderError) -> Error {
    match err {
        ProviderError::NotConfigured(message) => Error::Config { message },
        other => Error::ServiceUnavailable(other),
    }
}

/// Get the default base URL for well-known OpenAI-compatible providers.
pub fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        _ => None,
    }
}
