pub mod ask;
pub mod chat;

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::{self, Body},
    routing::post,
    Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Body of both `/chat` and `/ask`. A missing `message` is an empty prompt.
#[derive(Debug, Default, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub message: String,
}

impl PromptRequest {
    pub fn decode(body: &[u8]) -> Result<Self, ApiError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Collect and decode the body. No size limit is applied.
    pub async fn read(body: Body) -> Result<Self, ApiError> {
        let bytes = body::to_bytes(body, usize::MAX)
            .await
            .map_err(ApiError::UnreadableBody)?;
        Self::decode(&bytes)
    }
}

// Bind every path, method and handler the server answers
pub fn configure(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::handler).options(chat::handler))
        .route("/ask", post(ask::handler).options(ask::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message() {
        let request = PromptRequest::decode(br#"{"message": "hello"}"#).unwrap();
        assert_eq!(request.message, "hello");
    }

    #[test]
    fn test_missing_message_is_empty_prompt() {
        let request = PromptRequest::decode(b"{}").unwrap();
        assert_eq!(request.message, "");
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            PromptRequest::decode(b"not-json"),
            Err(ApiError::MalformedRequest(_))
        ));
        assert!(matches!(
            PromptRequest::decode(b""),
            Err(ApiError::MalformedRequest(_))
        ));
    }
}
