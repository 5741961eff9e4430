//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use ragrelay_agent::{PassthroughRelay, StreamRelay};
use ragrelay_core::config::RelayConfig;
use ragrelay_core::error::Result;
use ragrelay_core::traits::ChatProvider;
use ragrelay_knowledge::KnowledgeStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub knowledge: Arc<KnowledgeStore>,
    pub provider: Arc<dyn ChatProvider>,
    pub relay: StreamRelay,
    pub passthrough: PassthroughRelay,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire the pipeline around an already-built provider.
    pub fn new(config: RelayConfig, provider: Arc<dyn ChatProvider>) -> Self {
        let knowledge = Arc::new(KnowledgeStore::new(&config.knowledge));
        let default_model = config.upstream.default_model.clone();
        Self {
            relay: StreamRelay::new(knowledge.clone(), provider.clone(), default_model.clone()),
            passthrough: PassthroughRelay::new(provider.clone(), default_model),
            config: Arc::new(config),
            knowledge,
            provider,
            start_time: std::time::Instant::now(),
        }
    }

    /// Build the upstream provider named in `config.upstream`.
    pub fn from_config(config: RelayConfig) -> Result<Self> {
        let provider: Arc<dyn ChatProvider> =
            Arc::from(ragrelay_providers::create_provider(&config.upstream)?);
        Ok(Self::new(config, provider))
    }
}

fn cors_layer() -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    // Example: RAGRELAY_CORS_ORIGINS=https://guide.example.com,https://kiosk.example.com
    if let Ok(origins_str) = std::env::var("RAGRELAY_CORS_ORIGINS") {
        let origins: Vec<_> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();
        cors.allow_origin(origins)
    } else {
        cors.allow_origin(Any)
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(super::routes::root_info))
        .route("/health", get(super::routes::health_check))
        .route("/chat/completions", post(super::routes::chat_completions))
        .route("/rag/chat/completions", post(super::routes::rag_chat_completions))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server.
pub async fn start(config: RelayConfig) -> anyhow::Result<()> {
    let addr = config.server.bind_addr();
    let state = AppState::from_config(config)?;

    let status = state.knowledge.status().await;
    if status.loaded {
        tracing::info!(
            "📚 Knowledge base: {} ({} bytes)",
            state.knowledge.path().display(),
            status.size_bytes
        );
    } else {
        tracing::warn!(
            "⚠️ Knowledge base not available at {}: RAG requests will get the apology message",
            state.knowledge.path().display()
        );
    }
    if state.provider.is_configured() {
        tracing::info!(
            "🤖 Upstream: {} (default model {})",
            state.provider.name(),
            state.config.upstream.default_model
        );
    } else {
        tracing::warn!("⚠️ No API key configured for upstream provider {}", state.provider.name());
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 RagRelay listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
