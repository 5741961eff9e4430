//! Upstream provider abstraction.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{ChatMessage, CompletionChunk, GenerateParams};

/// Lazy, finite stream of upstream chunks. Dropping it cancels the call.
pub type ChunkStream = BoxStream<'static, Result<CompletionChunk>>;

/// A streaming chat-completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Whether a non-empty credential is configured (or none is required).
    fn is_configured(&self) -> bool;

    /// Open a streaming completion. Errors before the first chunk are returned
    /// here; errors mid-stream arrive as `Err` items.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerateParams,
    ) -> Result<ChunkStream>;
}
