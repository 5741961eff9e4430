//! Knowledge file access.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragrelay_core::config::KnowledgeConfig;
use ragrelay_core::error::{RelayError, Result};
use serde::Serialize;
use tokio::sync::RwLock;

/// Read-only handle on the knowledge text file.
///
/// By default every `load` re-reads the file, so edits are picked up on the
/// next request. With `cache = true` the first successful read is kept.
pub struct KnowledgeStore {
    path: PathBuf,
    fallback_chars: usize,
    cache: Option<RwLock<Option<Arc<str>>>>,
}

/// Snapshot reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeStatus {
    pub exists: bool,
    pub size_bytes: u64,
    pub loaded: bool,
}

impl KnowledgeStore {
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self {
            path: config.resolved_path(),
            fallback_chars: config.fallback_chars,
            cache: config.cache.then(|| RwLock::new(None)),
        }
    }

    /// Uncached store over `path` with the default fallback length.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let defaults = KnowledgeConfig::default();
        Self {
            path: path.into(),
            fallback_chars: defaults.fallback_chars,
            cache: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Load the knowledge text. Missing, unreadable or blank files are errors.
    pub async fn load(&self) -> Result<Arc<str>> {
        if let Some(cache) = &self.cache {
            if let Some(text) = cache.read().await.as_ref() {
                return Ok(text.clone());
            }
        }

        let text = self.read_file().await?;

        if let Some(cache) = &self.cache {
            *cache.write().await = Some(text.clone());
        }
        Ok(text)
    }

    async fn read_file(&self) -> Result<Arc<str>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!("❌ Knowledge base file not found: {}", self.path.display());
                return Err(RelayError::KnowledgeUnavailable(format!(
                    "file not found: {}",
                    self.path.display()
                )));
            }
            Err(e) => {
                tracing::error!("❌ Error loading knowledge base: {e}");
                return Err(RelayError::KnowledgeUnavailable(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            tracing::error!("❌ Knowledge base is empty: {}", self.path.display());
            return Err(RelayError::KnowledgeEmpty);
        }

        tracing::info!("✅ Loaded knowledge base: {} characters", content.chars().count());
        Ok(Arc::from(content))
    }

    /// Last-resort context: the first `fallback_chars` characters of `text`.
    pub fn fallback_context<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.fallback_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    /// File presence and size. `loaded` applies the same emptiness rule as
    /// [`KnowledgeStore::load`], so a blank file is reported as not loaded.
    pub async fn status(&self) -> KnowledgeStatus {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                return KnowledgeStatus {
                    exists: false,
                    size_bytes: 0,
                    loaded: false,
                };
            }
        };
        let loaded = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => !content.trim().is_empty(),
            Err(e) => {
                tracing::warn!("⚠️ Knowledge base exists but is unreadable: {e}");
                false
            }
        };
        KnowledgeStatus {
            exists: true,
            size_bytes: meta.len(),
            loaded,
        }
    }
}
