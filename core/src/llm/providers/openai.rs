//! OpenAI-compatible client implementation using async-openai library

use crate::config::ResolvedLlmConfig;
use crate::error::{ConfigError, Error, LlmError, Result};
use crate::llm::{
    ChatOptions, ContentBlock, FinishReason, LlmClient, LlmMessage, LlmResponse, MessageContent,
    MessageRole, ToolDefinition, Usage,
};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
        ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FunctionObject,
    },
    Client,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;

/// OpenAI-compatible client using async-openai library
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    /// Create a new client from resolved LLM config
    pub fn new(config: &ResolvedLlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Llm(LlmError::Authentication {
                message: "No API key configured for the model backend".to_string(),
            }));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        let mut client = Client::with_config(openai_config);
        if !config.headers.is_empty() {
            let http = reqwest::Client::builder()
                .default_headers(header_map(&config.headers)?)
                .build()
                .map_err(|e| LlmError::InvalidRequest {
                    message: format!("failed to build HTTP client: {}", e),
                })?;
            client = client.with_http_client(http);
        }

        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    /// Convert our internal message format to async-openai format
    fn convert_messages(
        &self,
        messages: Vec<LlmMessage>,
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut converted = Vec::with_capacity(messages.len());

        for message in messages {
            match message.role {
                MessageRole::System => {
                    let content = extract_text_content(&message.content);
                    converted.push(ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessage {
                            content: content.into(),
                            name: None,
                        },
                    ));
                }
                MessageRole::User => {
                    let content = extract_text_content(&message.content);
                    converted.push(ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessage {
                            content: content.into(),
                            name: None,
                        },
                    ));
                }
                MessageRole::Assistant => {
                    converted.push(convert_assistant_message(&message.content));
                }
                MessageRole::Tool => {
                    let mut pushed_any = false;
                    if let MessageContent::Blocks(blocks) = &message.content {
                        for block in blocks {
                            if let ContentBlock::ToolResult {
                                tool_use_id,
                                content,
                                ..
                            } = block
                            {
                                converted.push(ChatCompletionRequestMessage::Tool(
                                    ChatCompletionRequestToolMessage {
                                        content: ChatCompletionRequestToolMessageContent::Text(
                                            content.clone(),
                                        ),
                                        tool_call_id: tool_use_id.clone(),
                                    },
                                ));
                                pushed_any = true;
                            }
                        }
                    }
                    if !pushed_any {
                        return Err(LlmError::InvalidRequest {
                            message: "Tool message must contain a tool result".to_string(),
                        }
                        .into());
                    }
                }
            }
        }

        Ok(converted)
    }

    /// Convert our tool definitions to async-openai format
    fn convert_tools(&self, tools: Vec<ToolDefinition>) -> Vec<ChatCompletionTool> {
        tools
            .into_iter()
            .map(|tool| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: tool.function.name,
                    description: Some(tool.function.description),
                    parameters: Some(tool.function.parameters),
                    strict: None,
                },
            })
            .collect()
    }

    /// Convert async-openai response to our internal format
    fn convert_response(&self, response: CreateChatCompletionResponse) -> Result<LlmResponse> {
        let choice =
            response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::EmptyResponse {
                    message: "No choices in response".to_string(),
                })?;

        let text = choice.message.content.unwrap_or_default();
        let tool_calls = choice.message.tool_calls.unwrap_or_default();

        let message_content = if tool_calls.is_empty() {
            MessageContent::Text(text)
        } else {
            let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
            if !text.is_empty() {
                blocks.push(ContentBlock::Text { text });
            }
            blocks.extend(tool_calls.into_iter().map(convert_tool_call));
            MessageContent::Blocks(blocks)
        };

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let finish_reason = choice.finish_reason.map(|reason| match reason {
            async_openai::types::FinishReason::Stop => FinishReason::Stop,
            async_openai::types::FinishReason::Length => FinishReason::Length,
            async_openai::types::FinishReason::ToolCalls => FinishReason::ToolCalls,
            async_openai::types::FinishReason::ContentFilter => FinishReason::ContentFilter,
            async_openai::types::FinishReason::FunctionCall => FinishReason::ToolCalls,
        });

        Ok(LlmResponse {
            message: LlmMessage {
                role: MessageRole::Assistant,
                content: message_content,
            },
            usage,
            model: response.model,
            finish_reason,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<ToolDefinition>>,
        options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        let converted_messages = self.convert_messages(messages)?;
        let converted_tools = tools
            .filter(|t| !t.is_empty())
            .map(|t| self.convert_tools(t));

        if let Some(ref tools) = converted_tools {
            tracing::debug!("Chat completion request with {} tools enabled", tools.len());
        }

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model);
        request_builder.messages(converted_messages);

        if let Some(tools) = converted_tools {
            request_builder.tools(tools);
        }

        if let Some(opts) = options {
            if let Some(max_tokens) = opts.max_tokens {
                request_builder.max_tokens(max_tokens);
            }
            if let Some(temperature) = opts.temperature {
                request_builder.temperature(temperature);
            }
            if let Some(top_p) = opts.top_p {
                request_builder.top_p(top_p);
            }
        }

        let request = request_builder.build().map_err(|e| {
            tracing::error!("Failed to build chat completion request: {}", e);
            LlmError::InvalidRequest {
                message: format!("Failed to build request: {}", e),
            }
        })?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::error!("Chat completion call failed: {}", e);
            LlmError::ApiError {
                message: e.to_string(),
            }
        })?;

        let result = self.convert_response(response)?;
        let tool_call_count = result.message.get_tool_uses().len();
        if tool_call_count > 0 {
            tracing::debug!("Response contains {} tool calls", tool_call_count);
        }

        Ok(result)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "openai_compat"
    }
}

/// Extract text content from MessageContent
fn extract_text_content(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn convert_assistant_message(content: &MessageContent) -> ChatCompletionRequestMessage {
    let (text, tool_calls) = match content {
        MessageContent::Text(text) => (text.clone(), Vec::new()),
        MessageContent::Blocks(blocks) => {
            let mut text = String::new();
            let mut tool_calls = Vec::new();

            for block in blocks {
                match block {
                    ContentBlock::Text { text: part } => {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(part);
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        tool_calls.push(ChatCompletionMessageToolCall {
                            id: id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: async_openai::types::FunctionCall {
                                name: name.clone(),
                                arguments: input.to_string(),
                            },
                        });
                    }
                    ContentBlock::ToolResult { .. } => {}
                }
            }

            (text, tool_calls)
        }
    };

    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
        content: if text.is_empty() {
            None
        } else {
            Some(ChatCompletionRequestAssistantMessageContent::Text(text))
        },
        name: None,
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        audio: None,
        refusal: None,
        ..Default::default()
    })
}

/// Extra headers sent with every request
fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = |reason: String| ConfigError::InvalidValue {
            field: format!("headers.{}", name),
            value: reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Arguments that are not valid JSON are kept as a raw string
fn convert_tool_call(tool_call: ChatCompletionMessageToolCall) -> ContentBlock {
    let function = tool_call.function;
    let input: Value = serde_json::from_str(&function.arguments)
        .unwrap_or_else(|_| Value::String(function.arguments.clone()));

    ContentBlock::ToolUse {
        id: tool_call.id,
        name: function.name,
        input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use serde_json::json;

    fn client() -> OpenAiClient {
        let config = ResolvedLlmConfig::new(
            Protocol::OpenAICompat,
            "http://localhost:11434/v1".to_string(),
            "sk-test".to_string(),
            "qwen-plus".to_string(),
        );
        OpenAiClient::new(&config).unwrap()
    }

    fn response(message: Value) -> CreateChatCompletionResponse {
        serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "qwen-plus",
            "choices": [{
                "index": 0,
                "message": message,
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }))
        .unwrap()
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = ResolvedLlmConfig::new(
            Protocol::OpenAICompat,
            "https://api.openai.com/v1".to_string(),
            String::new(),
            "gpt-4o".to_string(),
        );
        assert!(matches!(
            OpenAiClient::new(&config),
            Err(Error::Llm(LlmError::Authentication { .. }))
        ));
    }

    #[test]
    fn test_header_map() {
        let mut headers = HashMap::new();
        headers.insert("X-DashScope-SSE".to_string(), "disable".to_string());
        headers.insert("HTTP-Referer".to_string(), "https://relay.local".to_string());

        let map = header_map(&headers).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["x-dashscope-sse"], "disable");
        assert_eq!(map["http-referer"], "https://relay.local");
    }

    #[test]
    fn test_new_with_headers() {
        let mut headers = HashMap::new();
        headers.insert("X-Team".to_string(), "weather".to_string());
        let config = ResolvedLlmConfig::new(
            Protocol::OpenAICompat,
            "https://api.openai.com/v1".to_string(),
            "sk-test".to_string(),
            "gpt-4o".to_string(),
        )
        .with_headers(headers);
        assert!(OpenAiClient::new(&config).is_ok());

        let mut bad = HashMap::new();
        bad.insert("Bad Header".to_string(), "x".to_string());
        let err = OpenAiClient::new(&config.clone().with_headers(bad)).err();
        assert!(matches!(
            err,
            Some(Error::Config(ConfigError::InvalidValue { ref field, .. })) if field == "headers.Bad Header"
        ));
    }

    #[test]
    fn test_convert_messages_keeps_tool_pairing() {
        let messages = vec![
            LlmMessage::user("weather in Beijing"),
            LlmMessage::assistant_tool_use(
                None,
                "call_1",
                "get_weather",
                json!({"location": "Beijing"}),
            ),
            LlmMessage::tool_result("call_1", "温度: 20", false),
            LlmMessage::assistant("It is 20 degrees."),
        ];

        let converted = client().convert_messages(messages).unwrap();
        assert_eq!(converted.len(), 4);
        assert!(matches!(converted[0], ChatCompletionRequestMessage::User(_)));
        match &converted[1] {
            ChatCompletionRequestMessage::Assistant(msg) => {
                assert!(msg.content.is_none());
                let calls = msg.tool_calls.as_ref().unwrap();
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].function.arguments, r#"{"location":"Beijing"}"#);
            }
            other => panic!("unexpected message: {:?}", other),
        }
        match &converted[2] {
            ChatCompletionRequestMessage::Tool(msg) => assert_eq!(msg.tool_call_id, "call_1"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_convert_messages_rejects_bare_tool_message() {
        let bare = LlmMessage {
            role: MessageRole::Tool,
            content: MessageContent::Text("orphan".to_string()),
        };
        assert!(client().convert_messages(vec![bare]).is_err());
    }

    #[test]
    fn test_convert_response_with_tool_calls() {
        let converted = client()
            .convert_response(response(json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "{\"location\":\"Beijing\"}"}
                }]
            })))
            .unwrap();

        let calls = converted.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "get_weather");
        assert_eq!(calls[0].arguments, json!({"location": "Beijing"}));
        assert_eq!(converted.text(), "");
        assert_eq!(converted.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(converted.usage.map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn test_convert_response_keeps_unparseable_arguments_raw() {
        let converted = client()
            .convert_response(response(json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "location=Beijing"}
                }]
            })))
            .unwrap();

        assert_eq!(
            converted.tool_calls()[0].arguments,
            Value::String("location=Beijing".to_string())
        );
    }

    #[test]
    fn test_convert_response_without_choices() {
        let empty: CreateChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "qwen-plus",
            "choices": []
        }))
        .unwrap();
        assert!(matches!(
            client().convert_response(empty),
            Err(Error::Llm(LlmError::EmptyResponse { .. }))
        ));
    }
}
