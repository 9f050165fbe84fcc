use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use relay::{
    engine::{Engine, PromptHandler},
    errors::{EngineError, EngineResult, ToolResult},
    tool::ToolCall,
};
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};
use tokio::sync::mpsc;

/// Payload of the frame that ends a successful answer
pub const DONE: &str = "[DONE]";

/// One unit written to the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Chunk(String),
    Done,
    Error(String),
}

impl Frame {
    pub fn encode(&self) -> Bytes {
        let payload = match self {
            Frame::Chunk(text) => text.clone(),
            Frame::Done => DONE.to_string(),
            Frame::Error(message) => format!("[error] {}", message),
        };
        Bytes::from(format!("data: {}\n\n", payload))
    }
}

pub fn log_tool_called(call: &ToolCall) {
    tracing::info!(
        event = "tool_called",
        tool = %call.name,
        args = %call.arguments,
        "tool called"
    );
}

pub fn log_tool_answered(call: &ToolCall, result: &ToolResult<String>) {
    let (output, is_error) = match result {
        Ok(output) => (output.clone(), false),
        Err(err) => (err.to_string(), true),
    };
    tracing::info!(
        event = "tool_answered",
        tool = %call.name,
        args = %call.arguments,
        result = %output,
        is_error,
        "tool answered"
    );
}

/// Writes frames into the response body. Once the client is gone every
/// further write is dropped.
pub struct FrameWriter {
    tx: mpsc::Sender<Bytes>,
    closed: bool,
}

impl FrameWriter {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx, closed: false }
    }

    /// Returns false if the frame could not be delivered
    pub async fn write(&mut self, frame: Frame) -> bool {
        if self.closed {
            return false;
        }
        if self.tx.send(frame.encode()).await.is_err() {
            tracing::debug!("client disconnected, dropping remaining frames");
            self.closed = true;
            return false;
        }
        true
    }
}

#[async_trait]
impl PromptHandler for FrameWriter {
    fn on_tool_called(&mut self, call: &ToolCall) {
        log_tool_called(call);
    }

    fn on_tool_answered(&mut self, call: &ToolCall, result: &ToolResult<String>) {
        log_tool_answered(call, result);
    }

    async fn on_chunk(&mut self, chunk: &str) {
        self.write(Frame::Chunk(chunk.to_string())).await;
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one prompt, turning a panic anywhere inside the engine or its
/// handler into an ordinary engine failure.
pub async fn run_prompt(
    engine: &dyn Engine,
    message: &str,
    handler: &mut dyn PromptHandler,
) -> EngineResult<String> {
    match AssertUnwindSafe(engine.prompt(message, handler))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => Err(EngineError::Panicked(panic_message(panic))),
    }
}

/// Drive one engine invocation to completion, writing each answer chunk as a
/// frame and finishing with exactly one terminal frame.
///
/// If the client disconnects the engine call is dropped and nothing more is
/// written.
pub async fn stream_prompt(engine: Arc<dyn Engine>, message: String, tx: mpsc::Sender<Bytes>) {
    let disconnected = tx.clone();
    let mut writer = FrameWriter::new(tx);

    let outcome = tokio::select! {
        result = run_prompt(engine.as_ref(), &message, &mut writer) => Some(result),
        _ = disconnected.closed() => None,
    };

    let terminal = match outcome {
        Some(Ok(_)) => Frame::Done,
        Some(Err(err)) => {
            tracing::warn!(error = %err, "prompt failed");
            Frame::Error(err.to_string())
        }
        None => {
            tracing::debug!("client disconnected, prompt abandoned");
            return;
        }
    };
    writer.write(terminal).await;
}
