//! RagRelay configuration system.
//!
//! Built once at process start and shared by `Arc`; no component reads
//! credentials or paths from globals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RelayError, Result};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "RAGRELAY_CONFIG";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl RelayConfig {
    /// Load config from `$RAGRELAY_CONFIG` or the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("Failed to read config: {e}")))?;
        tracing::debug!("Loaded config from {}", path.display());
        Self::from_toml(&content)
    }

    /// Parse config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RelayError::Config(format!("Failed to parse config: {e}")))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the RagRelay home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ragrelay")
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Knowledge file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_path")]
    pub path: String,
    /// Keep the text in memory after the first successful read.
    #[serde(default)]
    pub cache: bool,
    /// Prefix length used when retrieval produces no context at all.
    #[serde(default = "default_fallback_chars")]
    pub fallback_chars: usize,
}

fn default_knowledge_path() -> String { "./my_city_info.txt".into() }
fn default_fallback_chars() -> usize { 500 }

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: default_knowledge_path(),
            cache: false,
            fallback_chars: default_fallback_chars(),
        }
    }
}

impl KnowledgeConfig {
    /// Path with `~` and env vars expanded.
    pub fn resolved_path(&self) -> PathBuf {
        let expanded = shellexpand::full(&self.path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| self.path.clone());
        PathBuf::from(expanded)
    }
}

/// Upstream chat-completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Registry name (`groq`, `openai`, ...) or `custom:<base url>`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    /// Overrides the registry base URL when non-empty.
    #[serde(default)]
    pub endpoint: String,
    /// Model used when a request omits `model`.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// No timeout is applied when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_provider() -> String { "groq".into() }
fn default_model() -> String { "llama-3.3-70b-versatile".into() }

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: String::new(),
            endpoint: String::new(),
            default_model: default_model(),
            timeout_secs: None,
        }
    }
}
