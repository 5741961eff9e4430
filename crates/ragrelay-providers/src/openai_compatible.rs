//! Unified OpenAI-compatible streaming provider.
//!
//! A single struct that streams chat completions from ALL OpenAI-compatible
//! APIs. Different providers are distinguished only by endpoint URL, auth
//! style, and API key.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use ragrelay_core::config::UpstreamConfig;
use ragrelay_core::error::{RelayError, Result};
use ragrelay_core::traits::{ChatProvider, ChunkStream};
use ragrelay_core::types::{ChatMessage, GenerateParams};
use serde_json::{Value, json};

use crate::provider_registry::{AuthStyle, ProviderConfig};
use crate::sse;

/// A unified provider that works with any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    /// Provider name (e.g., "groq", "openai").
    name: String,
    /// API key for authentication.
    api_key: String,
    /// Base URL for the API (e.g., "https://api.groq.com/openai/v1").
    base_url: String,
    /// Path for chat completions (e.g., "/chat/completions").
    chat_path: String,
    /// Authentication style.
    auth_style: AuthStyle,
    /// Whole-request deadline, covering the streamed body.
    timeout_secs: Option<u64>,
    /// HTTP client.
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create from a known provider config + upstream config.
    ///
    /// Resolution order:
    /// - API key: `upstream.api_key` > env vars > empty
    /// - Base URL: `upstream.endpoint` > env override > registry default
    pub fn from_registry(registry: &ProviderConfig, config: &UpstreamConfig) -> Result<Self> {
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            registry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
                .unwrap_or_default()
        };

        let base_url = if !config.endpoint.is_empty() {
            config.endpoint.trim_end_matches('/').to_string()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| {
                    let val = std::env::var(env_key).ok()?;
                    // For OLLAMA_HOST / LLAMACPP_HOST, append /v1 if not present
                    if val.ends_with("/v1") {
                        Some(val)
                    } else {
                        Some(format!("{}/v1", val.trim_end_matches('/')))
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            base_url,
            chat_path: registry.chat_path.to_string(),
            auth_style: registry.auth_style,
            timeout_secs: config.timeout_secs,
            client: build_client(config.timeout_secs)?,
        })
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, config: &UpstreamConfig) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();

        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };

        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Ok(Self {
            name: "custom".to_string(),
            api_key,
            base_url,
            chat_path: "/chat/completions".to_string(),
            auth_style,
            timeout_secs: config.timeout_secs,
            client: build_client(config.timeout_secs)?,
        })
    }

    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, self.chat_path)
    }

    /// Build the auth header for the request.
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            _ => req,
        }
    }
}

/// Map a transport error, reporting deadline hits as `Timeout`.
fn map_transport_error(e: reqwest::Error, timeout_secs: Option<u64>, context: &str) -> RelayError {
    match timeout_secs {
        Some(secs) if e.is_timeout() => RelayError::Timeout(secs),
        _ => RelayError::Http(format!("{context}: {e}")),
    }
}

fn build_client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Streaming request body in the standard OpenAI format.
pub fn request_body(messages: &[ChatMessage], params: &GenerateParams) -> Result<Value> {
    Ok(json!({
        "model": params.model,
        "messages": serde_json::to_value(messages)?,
        "max_tokens": params.max_tokens,
        "temperature": params.temperature,
        "stream": true,
    }))
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.auth_style == AuthStyle::None || !self.api_key.is_empty()
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerateParams,
    ) -> Result<ChunkStream> {
        if !self.is_configured() {
            return Err(RelayError::ApiKeyMissing(self.name.clone()));
        }

        let body = request_body(messages, params)?;
        let url = self.chat_url();
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body);
        let req = self.apply_auth(req);

        tracing::debug!("➡️ {} streaming request to {} ({} messages)", self.name, url, messages.len());

        let resp = req.send().await.map_err(|e| {
            let context = format!("{} connection failed ({})", self.name, url);
            map_transport_error(e, self.timeout_secs, &context)
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RelayError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let timeout_secs = self.timeout_secs;
        let context = format!("{} stream failed", self.name);
        let bytes = resp
            .bytes_stream()
            .map_err(move |e| map_transport_error(e, timeout_secs, &context));
        Ok(sse::chunk_stream(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider_registry::get_provider_config;

    fn upstream(api_key: &str, endpoint: &str) -> UpstreamConfig {
        UpstreamConfig {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            ..UpstreamConfig::default()
        }
    }

    #[test]
    fn test_config_key_wins() {
        let registry = get_provider_config("groq").unwrap();
        let provider = OpenAiCompatibleProvider::from_registry(registry, &upstream("gsk_test", "")).unwrap();
        assert!(provider.is_configured());
        assert_eq!(provider.chat_url(), "https://api.groq.com/openai/v1/chat/completions");
    }

    #[test]
    fn test_endpoint_override() {
        let registry = get_provider_config("openai").unwrap();
        let provider = OpenAiCompatibleProvider::from_registry(
            registry,
            &upstream("k", "http://127.0.0.1:9999/v1/"),
        )
        .unwrap();
        assert_eq!(provider.chat_url(), "http://127.0.0.1:9999/v1/chat/completions");
    }

    #[test]
    fn test_local_provider_is_configured_without_key() {
        let registry = get_provider_config("llamacpp").unwrap();
        let provider = OpenAiCompatibleProvider::from_registry(registry, &upstream("", "")).unwrap();
        assert!(provider.is_configured());
    }

    #[test]
    fn test_custom_endpoint() {
        let provider =
            OpenAiCompatibleProvider::custom("custom:http://gpu-box:8000/v1/", &upstream("k", ""))
                .unwrap();
        assert_eq!(provider.name(), "custom");
        assert_eq!(provider.chat_url(), "http://gpu-box:8000/v1/chat/completions");
    }

    #[test]
    fn test_request_body_forces_stream() {
        let params = GenerateParams {
            model: "llama-3.3-70b-versatile".into(),
            max_tokens: 256,
            temperature: 0.2,
        };
        let body = request_body(&[ChatMessage::system("ctx"), ChatMessage::user("hi")], &params)
            .unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let registry = ProviderConfig {
            name: "keyless-test",
            base_url: "http://127.0.0.1:1",
            chat_path: "/chat/completions",
            env_keys: &[],
            auth_style: AuthStyle::Bearer,
            base_url_env: None,
        };
        let provider = OpenAiCompatibleProvider::from_registry(&registry, &upstream("", "")).unwrap();
        assert!(!provider.is_configured());
        let params = GenerateParams { model: "m".into(), max_tokens: 1, temperature: 0.0 };
        let err = provider.stream_chat(&[ChatMessage::user("hi")], &params).await.err().unwrap();
        assert!(matches!(err, RelayError::ApiKeyMissing(name) if name == "keyless-test"));
    }

    /// Accepts connections and never answers them.
    async fn silent_listener() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let addr = silent_listener().await;
        let config = UpstreamConfig {
            timeout_secs: Some(1),
            ..UpstreamConfig::default()
        };
        let provider =
            OpenAiCompatibleProvider::custom(&format!("custom:http://{addr}/v1"), &config).unwrap();
        let params = GenerateParams { model: "m".into(), max_tokens: 1, temperature: 0.0 };

        let started = std::time::Instant::now();
        let err = provider.stream_chat(&[ChatMessage::user("hi")], &params).await.err().unwrap();
        assert!(matches!(err, RelayError::Timeout(1)), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_connection_refused_is_http_error() {
        let provider =
            OpenAiCompatibleProvider::custom("custom:http://127.0.0.1:1/v1", &upstream("", ""))
                .unwrap();
        let params = GenerateParams { model: "m".into(), max_tokens: 1, temperature: 0.0 };
        let err = provider.stream_chat(&[ChatMessage::user("hi")], &params).await.err().unwrap();
        assert!(matches!(err, RelayError::Http(_)));
    }
}
