use crate::bridge::{self, log_tool_answered, log_tool_called};
use crate::error::ApiError;
use crate::negotiate::{self, Admission};
use crate::routes::PromptRequest;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relay::{engine::PromptHandler, errors::ToolResult, tool::ToolCall};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct AskResponse {
    text: String,
}

// Chunks are not forwarded; the answer goes out in one piece
struct ToolLogger;

#[async_trait]
impl PromptHandler for ToolLogger {
    fn on_tool_called(&mut self, call: &ToolCall) {
        log_tool_called(call);
    }

    fn on_tool_answered(&mut self, call: &ToolCall, result: &ToolResult<String>) {
        log_tool_answered(call, result);
    }

    async fn on_chunk(&mut self, _chunk: &str) {}
}

async fn answer(state: AppState, method: Method, body: Body) -> Result<Response, ApiError> {
    if negotiate::admit(&method) == Admission::Preflight {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let request = PromptRequest::read(body).await?;

    let text = bridge::run_prompt(state.engine.as_ref(), &request.message, &mut ToolLogger).await?;
    Ok(Json(AskResponse { text }).into_response())
}

/// `POST /ask`: answer a prompt without streaming
pub async fn handler(
    State(state): State<AppState>,
    method: Method,
    body: Body,
) -> impl IntoResponse {
    (negotiate::cors_headers(), answer(state, method, body).await)
}
