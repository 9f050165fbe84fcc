use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of a single prompt invocation.
///
/// The gateway never distinguishes these for its clients; the display text is
/// what ends up in the error frame.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum EngineError {
    #[error("request to model host failed: {0}")]
    Request(String),

    #[error("model host returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable response from model host: {0}")]
    Protocol(String),

    #[error("{0}")]
    Host(String),

    #[error("gave up after {0} tool rounds")]
    TooManyRounds(usize),

    #[error("engine panicked: {0}")]
    Panicked(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

pub type ToolResult<T> = Result<T, ToolError>;
