use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::engine::{Engine, PromptHandler};
use crate::errors::{EngineError, EngineResult};
use crate::tool::{Tool, ToolCall, ToolSet};

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "llama3.1:8b";
pub const OLLAMA_MAX_ROUNDS: usize = 8;
/// Longest stream line accepted from the host before the round is abandoned
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    /// Upper bound on model round trips for one prompt, tool rounds included
    pub max_rounds: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: OLLAMA_HOST.to_string(),
            model: OLLAMA_MODEL.to_string(),
            system_prompt: None,
            temperature: None,
            max_rounds: OLLAMA_MAX_ROUNDS,
        }
    }
}

/// Streams answers from an Ollama `/api/chat` endpoint, running tool calls
/// through a [`ToolSet`] until the model produces a plain answer.
pub struct OllamaEngine {
    client: Client,
    config: OllamaConfig,
    tools: Arc<dyn ToolSet>,
}

// One line of the newline-delimited JSON stream
#[derive(Debug, Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<LineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<LineToolCall>,
}

#[derive(Debug, Deserialize)]
struct LineToolCall {
    function: ToolCall,
}

#[derive(Debug, Default)]
struct Round {
    content: String,
    tool_calls: Vec<ToolCall>,
    done: bool,
}

impl Round {
    async fn apply(&mut self, line: &[u8], handler: &mut dyn PromptHandler) -> EngineResult<()> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let parsed: ChatLine =
            serde_json::from_str(line).map_err(|e| EngineError::Protocol(e.to_string()))?;
        if let Some(error) = parsed.error {
            return Err(EngineError::Host(error));
        }
        if let Some(message) = parsed.message {
            if !message.content.is_empty() {
                handler.on_chunk(&message.content).await;
                self.content.push_str(&message.content);
            }
            self.tool_calls
                .extend(message.tool_calls.into_iter().map(|call| call.function));
        }
        self.done = parsed.done;
        Ok(())
    }
}

impl OllamaEngine {
    pub fn new(config: OllamaConfig, tools: Arc<dyn ToolSet>) -> EngineResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| EngineError::Request(e.to_string()))?;

        Ok(Self {
            client,
            config,
            tools,
        })
    }

    fn payload(&self, messages: &[Value], tools: &[Tool]) -> Value {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
        });

        if !tools.is_empty() {
            let tools_spec: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            payload["tools"] = json!(tools_spec);
        }
        if let Some(temperature) = self.config.temperature {
            payload["options"] = json!({ "temperature": temperature });
        }
        payload
    }

    async fn round(
        &self,
        messages: &[Value],
        tools: &[Tool],
        handler: &mut dyn PromptHandler,
    ) -> EngineResult<Round> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&self.payload(messages, tools))
            .send()
            .await
            .map_err(|e| EngineError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut round = Round::default();
        let mut buffer: Vec<u8> = Vec::new();
        let mut body = response.bytes_stream();
        while let Some(bytes) = body.next().await {
            let bytes = bytes.map_err(|e| EngineError::Request(e.to_string()))?;
            buffer.extend_from_slice(&bytes);
            while let Some(end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=end).collect();
                round.apply(&line, handler).await?;
                if round.done {
                    return Ok(round);
                }
            }
            if buffer.len() > MAX_LINE_BYTES {
                return Err(EngineError::Protocol(format!(
                    "stream line longer than {} bytes",
                    MAX_LINE_BYTES
                )));
            }
        }
        round.apply(&buffer, handler).await?;

        if round.done {
            Ok(round)
        } else {
            Err(EngineError::Protocol(
                "stream ended before the answer was complete".to_string(),
            ))
        }
    }
}

#[async_trait]
impl Engine for OllamaEngine {
    async fn prompt(&self, prompt: &str, handler: &mut dyn PromptHandler) -> EngineResult<String> {
        let tools = self.tools.tools();
        let mut messages = Vec::new();
        if let Some(system) = &self.config.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        for _ in 0..self.config.max_rounds {
            let round = self.round(&messages, &tools, handler).await?;
            if round.tool_calls.is_empty() {
                return Ok(round.content);
            }

            let requested: Vec<Value> = round
                .tool_calls
                .iter()
                .map(|call| json!({ "function": call }))
                .collect();
            messages.push(json!({
                "role": "assistant",
                "content": round.content,
                "tool_calls": requested,
            }));

            for call in &round.tool_calls {
                handler.on_tool_called(call);
                let result = self.tools.call(call).await;
                handler.on_tool_answered(call, &result);

                let content = match &result {
                    Ok(output) => output.clone(),
                    Err(err) => format!("Error: {}", err),
                };
                messages.push(json!({ "role": "tool", "content": content }));
            }
        }

        tracing::warn!(
            model = %self.config.model,
            max_rounds = self.config.max_rounds,
            "model kept requesting tools"
        );
        Err(EngineError::TooManyRounds(self.config.max_rounds))
    }
}
