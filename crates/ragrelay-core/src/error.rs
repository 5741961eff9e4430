//! Error taxonomy shared by every RagRelay crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Knowledge base unavailable: {0}")]
    KnowledgeUnavailable(String),

    #[error("Knowledge base is empty")]
    KnowledgeEmpty,

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed stream chunk: {0}")]
    MalformedChunk(String),

    #[error("Upstream timed out after {0}s")]
    Timeout(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RelayError {
    /// Configuration problems, as opposed to runtime upstream failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::KnowledgeUnavailable(_)
                | Self::KnowledgeEmpty
                | Self::ApiKeyMissing(_)
                | Self::ProviderNotFound(_)
        )
    }
}
