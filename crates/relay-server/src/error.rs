use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay::errors::EngineError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {env_var}: {reason}")]
    InvalidValue { env_var: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

// Convert a dotted settings key to its environment variable name
pub fn to_env_var(field_path: &str) -> String {
    format!("RELAY_{}", field_path.to_uppercase().replace('.', "__"))
}

/// Failures that end an exchange before any frame has been written.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    MalformedRequest(#[from] serde_json::Error),

    #[error("failed to read request body: {0}")]
    UnreadableBody(axum::Error),

    #[error("streaming unsupported")]
    StreamingUnsupported,

    #[error("{0}")]
    Engine(#[from] EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "rejecting request");
        match self {
            ApiError::MalformedRequest(_) | ApiError::UnreadableBody(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            ApiError::StreamingUnsupported => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
            ApiError::Engine(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
        }
    }
}
