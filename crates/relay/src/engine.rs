use async_trait::async_trait;

use crate::errors::{EngineResult, ToolResult};
use crate::tool::ToolCall;

/// Receives everything an engine produces while answering one prompt.
///
/// Hooks are called sequentially, in generation order, and all of them before
/// [`Engine::prompt`] returns. Tool hooks are synchronous so they can never hold
/// up chunk delivery.
#[async_trait]
pub trait PromptHandler: Send {
    /// The model asked for a tool to be run
    fn on_tool_called(&mut self, call: &ToolCall);

    /// A tool run finished, successfully or not
    fn on_tool_answered(&mut self, call: &ToolCall, result: &ToolResult<String>);

    /// The next piece of answer text. The engine does not continue until this returns.
    async fn on_chunk(&mut self, chunk: &str);
}

/// A prompt-answering host
#[async_trait]
pub trait Engine: Send + Sync {
    /// Answer a single prompt, reporting progress to `handler`, and return the final text
    async fn prompt(&self, prompt: &str, handler: &mut dyn PromptHandler) -> EngineResult<String>;
}
