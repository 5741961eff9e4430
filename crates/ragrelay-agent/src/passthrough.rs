//! Plain streaming proxy: no retrieval, no waiting chunk.

use std::sync::Arc;

use futures::StreamExt;
use ragrelay_core::traits::ChatProvider;
use ragrelay_core::types::ChatCompletionRequest;
use serde_json::json;

use crate::relay::{RelayEvent, RelayStream};

/// Forwards the caller's messages upstream unchanged.
///
/// Failures are reported in-band as a bare `{"error": "..."}` object,
/// followed by the sentinel.
#[derive(Clone)]
pub struct PassthroughRelay {
    provider: Arc<dyn ChatProvider>,
    default_model: String,
}

impl PassthroughRelay {
    pub fn new(provider: Arc<dyn ChatProvider>, default_model: impl Into<String>) -> Self {
        Self { provider, default_model: default_model.into() }
    }

    pub fn relay(&self, request: ChatCompletionRequest) -> RelayStream {
        let this = self.clone();

        Box::pin(async_stream::stream! {
            let params = request.params(&this.default_model);
            tracing::info!("🔀 Passthrough to {} ({})", this.provider.name(), params.model);

            let mut upstream = match this.provider.stream_chat(&request.messages, &params).await {
                Ok(upstream) => upstream,
                Err(e) => {
                    tracing::error!("❌ Passthrough request failed: {e}");
                    yield RelayEvent::Error(json!({ "error": e.to_string() }));
                    yield RelayEvent::Done;
                    return;
                }
            };

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => yield RelayEvent::Chunk(chunk),
                    Err(e) => {
                        tracing::error!("❌ Passthrough stream failed: {e}");
                        yield RelayEvent::Error(json!({ "error": e.to_string() }));
                        break;
                    }
                }
            }
            yield RelayEvent::Done;
        })
    }
}
