//! Test doubles shared by the unit tests: a scripted model, an in-memory tool
//! provider and a fake MCP server speaking over in-memory pipes.

use crate::error::{LlmError, ProviderError, Result};
use crate::llm::{
    ChatOptions, ContentBlock, LlmClient, LlmMessage, LlmResponse, MessageContent, MessageRole,
    ToolDefinition, Usage,
};
use crate::tools::{ToolArguments, ToolDescriptor, ToolOutput, ToolProvider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

/// One model request as the scripted model received it
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub messages: Vec<LlmMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub options: Option<ChatOptions>,
}

enum Step {
    Reply(LlmResponse),
    Fail(String),
}

/// Model that replays scripted responses in order
#[derive(Default)]
pub(crate) struct ScriptedLlm {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, response: LlmResponse) -> Self {
        self.script.lock().unwrap().push_back(Step::Reply(response));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Step::Fail(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<ToolDefinition>>,
        options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages,
            tools,
            options,
        });

        match self.script.lock().unwrap().pop_front() {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Fail(message)) => Err(LlmError::ApiError { message }.into()),
            None => Err(LlmError::EmptyResponse {
                message: "script exhausted".to_string(),
            }
            .into()),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A plain text answer
pub(crate) fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        message: LlmMessage::assistant(text),
        usage: usage(),
        model: "scripted".to_string(),
        finish_reason: None,
    }
}

/// A response requesting tools, given as (id, name, arguments)
pub(crate) fn tool_call_response(text: &str, calls: &[(&str, &str, Value)]) -> LlmResponse {
    let mut blocks = Vec::new();
    if !text.is_empty() {
        blocks.push(ContentBlock::Text {
            text: text.to_string(),
        });
    }
    for (id, name, input) in calls {
        blocks.push(ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input: input.clone(),
        });
    }

    LlmResponse {
        message: LlmMessage {
            role: MessageRole::Assistant,
            content: MessageContent::Blocks(blocks),
        },
        usage: usage(),
        model: "scripted".to_string(),
        finish_reason: None,
    }
}

#[derive(Default)]
struct FakeState {
    tools: Mutex<Vec<ToolDescriptor>>,
    outputs: Mutex<HashMap<String, ToolOutput>>,
    down: AtomicBool,
    calls_down: AtomicBool,
    list_calls: AtomicUsize,
    calls: Mutex<Vec<(String, ToolArguments)>>,
}

/// In-memory provider; clones share state so tests can inspect it
#[derive(Clone, Default)]
pub(crate) struct FakeProvider {
    state: Arc<FakeState>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(self, descriptor: ToolDescriptor, output: ToolOutput) -> Self {
        self.state
            .outputs
            .lock()
            .unwrap()
            .insert(descriptor.name.clone(), output);
        self.state.tools.lock().unwrap().push(descriptor);
        self
    }

    pub fn set_down(&self, down: bool) {
        self.state.down.store(down, Ordering::SeqCst);
    }

    /// Keep listing working but drop the connection on every call
    pub fn set_calls_down(&self, down: bool) {
        self.state.calls_down.store(down, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, ToolArguments)> {
        self.state.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        if self.state.down.load(Ordering::SeqCst) {
            return Err(ProviderError::unavailable("connection dropped").into());
        }
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.tools.lock().unwrap().clone())
    }

    async fn call_tool(&self, name: &str, arguments: ToolArguments) -> Result<ToolOutput> {
        if self.state.down.load(Ordering::SeqCst) || self.state.calls_down.load(Ordering::SeqCst) {
            return Err(ProviderError::unavailable("connection dropped").into());
        }
        self.state
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        Ok(self
            .state
            .outputs
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolOutput::error(format!("Unknown tool: {}", name))))
    }
}

/// The `get_weather(location)` tool used throughout the tests
pub(crate) fn weather_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_weather",
        "Get current weather for a location.",
        json!({
            "type": "object",
            "properties": {"location": {"type": "string", "description": "city name of china"}},
            "required": ["location"]
        }),
    )
}

/// Run a fake MCP server on in-memory pipes.
///
/// `handler` sees every request that carries an id and returns the lines to
/// write back; returning `None` hangs up.
pub(crate) fn spawn_fake_server<F>(
    handler: F,
) -> (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>)
where
    F: Fn(&Value) -> Option<Vec<Value>> + Send + 'static,
{
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (client_read, client_write) = tokio::io::split(client);

    tokio::spawn(async move {
        let (server_read, mut server_write) = tokio::io::split(server);
        let mut lines = BufReader::new(server_read).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(request) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            if request.get("id").is_none() {
                continue;
            }

            let Some(replies) = handler(&request) else {
                return;
            };
            for reply in replies {
                let mut out = reply.to_string();
                out.push('\n');
                if server_write.write_all(out.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    });

    (client_read, client_write)
}
