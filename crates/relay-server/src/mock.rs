use async_trait::async_trait;
use relay::engine::{Engine, PromptHandler};
use relay::errors::{EngineError, EngineResult, ToolResult};
use relay::tool::ToolCall;
use std::sync::{Arc, Mutex};

/// One thing the mock engine does while answering
#[derive(Debug, Clone)]
pub enum Step {
    Chunk(String),
    ToolCalled(ToolCall),
    ToolAnswered(ToolCall, ToolResult<String>),
    Panic(&'static str),
    /// Never finish
    Hang,
}

impl Step {
    pub fn chunk(text: &str) -> Self {
        Step::Chunk(text.to_string())
    }
}

/// An engine that replays a fixed script and records the prompts it was given
pub struct MockEngine {
    script: Vec<Step>,
    outcome: EngineResult<()>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockEngine {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            outcome: Ok(()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(script: Vec<Step>, error: EngineError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::new(script)
        }
    }

    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts.clone()
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn prompt(&self, prompt: &str, handler: &mut dyn PromptHandler) -> EngineResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let mut text = String::new();
        for step in &self.script {
            match step {
                Step::Chunk(chunk) => {
                    handler.on_chunk(chunk).await;
                    text.push_str(chunk);
                }
                Step::ToolCalled(call) => handler.on_tool_called(call),
                Step::ToolAnswered(call, result) => handler.on_tool_answered(call, result),
                Step::Panic(message) => panic!("{}", message),
                Step::Hang => futures::future::pending::<()>().await,
            }
        }

        self.outcome.clone().map(|_| text)
    }
}
