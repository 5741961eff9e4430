//! # RagRelay Gateway
//! HTTP server exposing the relay as OpenAI-compatible SSE endpoints.
//!
//! ## Endpoints:
//! - `POST /rag/chat/completions`: retrieval-augmented relay
//! - `POST /chat/completions`: plain passthrough
//! - `GET /health`: knowledge file and upstream status
//! - `GET /`: service info

pub mod error;
pub mod routes;
pub mod server;

pub use error::GatewayError;
pub use server::{AppState, build_router, start};
