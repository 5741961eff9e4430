//! # RagRelay Providers
//!
//! Upstream chat-completion providers for RagRelay.
//!
//! All supported upstreams (Groq, OpenAI, OpenRouter, Ollama,
//! llama.cpp, ...) speak the OpenAI streaming protocol and are handled by a
//! single `OpenAiCompatibleProvider`.

pub mod openai_compatible;
pub mod provider_registry;
pub mod sse;

use ragrelay_core::config::UpstreamConfig;
use ragrelay_core::error::{RelayError, Result};
use ragrelay_core::traits::ChatProvider;

/// Create a provider from configuration.
///
/// `upstream.provider` is either a registry name or `custom:<base url>`.
pub fn create_provider(config: &UpstreamConfig) -> Result<Box<dyn ChatProvider>> {
    match config.provider.as_str() {
        // Custom endpoint: "custom:https://my-server.com/v1"
        other if other.starts_with("custom:") => Ok(Box::new(
            openai_compatible::OpenAiCompatibleProvider::custom(other, config)?,
        )),

        name => {
            let registry = provider_registry::get_provider_config(name).ok_or_else(|| {
                tracing::error!(
                    "❌ Unknown provider '{}'. Known: {}, custom:<url>",
                    name,
                    provider_registry::all_provider_names().join(", ")
                );
                RelayError::ProviderNotFound(name.into())
            })?;
            Ok(Box::new(
                openai_compatible::OpenAiCompatibleProvider::from_registry(registry, config)?,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_known_provider() {
        let config = UpstreamConfig {
            api_key: "gsk_test".into(),
            ..UpstreamConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "groq");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_create_custom_provider() {
        let config = UpstreamConfig {
            provider: "custom:http://localhost:9000/v1".into(),
            ..UpstreamConfig::default()
        };
        assert_eq!(create_provider(&config).unwrap().name(), "custom");
    }

    #[test]
    fn test_unknown_provider() {
        let config = UpstreamConfig {
            provider: "carrier-pigeon".into(),
            ..UpstreamConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, RelayError::ProviderNotFound(name) if name == "carrier-pigeon"));
    }
}
