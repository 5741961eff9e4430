//! Request-level errors returned before a stream is opened.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Chat completions require streaming")]
    StreamingRequired,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::StreamingRequired => StatusCode::BAD_REQUEST,
            GatewayError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::StreamingRequired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GatewayError::InvalidRequest("missing field `messages`".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_detail_message() {
        assert_eq!(
            GatewayError::StreamingRequired.to_string(),
            "Chat completions require streaming"
        );
    }
}
