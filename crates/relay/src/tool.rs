use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

use crate::errors::{ToolError, ToolResult};

/// A tool that can be offered to a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema of the arguments the tool accepts
    pub parameters: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The arguments for the execution
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The tools an engine may execute on the model's behalf.
#[async_trait]
pub trait ToolSet: Send + Sync {
    fn tools(&self) -> Vec<Tool>;

    async fn call(&self, call: &ToolCall) -> ToolResult<String>;
}

/// A tool set with nothing in it. The model is never offered any tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTools;

#[async_trait]
impl ToolSet for NoTools {
    fn tools(&self) -> Vec<Tool> {
        Vec::new()
    }

    async fn call(&self, call: &ToolCall) -> ToolResult<String> {
        Err(ToolError::ToolNotFound(call.name.clone()))
    }
}
