//! API route handlers for the gateway.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Sse;
use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use ragrelay_agent::{RelayEvent, RelayStream};
use ragrelay_core::types::ChatCompletionRequest;

use crate::error::GatewayError;
use crate::server::AppState;

/// Service info endpoint.
pub async fn root_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "RagRelay - Central City Mall guide",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/chat/completions": "Standard chat completions",
            "/rag/chat/completions": "RAG-enhanced chat completions",
            "/health": "Health check",
        },
        "provider": state.provider.name(),
        "default_model": state.config.upstream.default_model,
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "status": "running",
    }))
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let status = state.knowledge.status().await;
    Json(serde_json::json!({
        "status": "healthy",
        "knowledge_base_loaded": status.loaded,
        "knowledge_base_size": status.size_bytes,
        "upstream_api_configured": state.provider.is_configured(),
    }))
}

/// Retrieval-augmented chat completions (SSE).
pub async fn rag_chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, GatewayError> {
    tracing::info!("📨 New RAG chat completion request");
    let request = streaming_request(payload)?;
    Ok(sse_response(state.relay.relay(request)))
}

/// Plain passthrough chat completions (SSE).
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, GatewayError> {
    tracing::info!("📨 Received standard chat completion request");
    let request = streaming_request(payload)?;
    Ok(sse_response(state.passthrough.relay(request)))
}

/// Reject malformed bodies and `stream: false` before any work starts.
fn streaming_request(
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<ChatCompletionRequest, GatewayError> {
    let Json(request) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    if !request.stream {
        tracing::warn!("⚠️ Rejected non-streaming request");
        return Err(GatewayError::StreamingRequired);
    }
    Ok(request)
}

fn sse_response(stream: RelayStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(stream.map(|event| Ok(to_sse_event(&event))))
}

fn to_sse_event(event: &RelayEvent) -> Event {
    match event.data() {
        Ok(data) => Event::default().data(data),
        Err(e) => {
            tracing::error!("❌ Failed to serialize stream event: {e}");
            Event::default().data(serde_json::json!({ "error": e.to_string() }).to_string())
        }
    }
}
