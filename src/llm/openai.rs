//! OpenAI chat-completions adapter.
//!
//! Maps the block-structured conversation onto OpenAI messages: assistant
//! tool-use blocks become `tool_calls`, tool-result blocks become `tool`
//! role messages. Responses are decoded back into `ContentBlock`s here and
//! nowhere else.

use super::{
    ContentBlock, LanguageModel, Message, MessageContent, ModelRequest, ModelResponse, Role,
    StopReason, ToolChoice, ToolDefinition,
};
use crate::error::{CoursemateError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FinishReason, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with the default timeout.
pub fn create_client(api_base: Option<&str>) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(api_base, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
///
/// The API key is read from `OPENAI_API_KEY`.
pub fn create_client_with_timeout(
    api_base: Option<&str>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let mut config = OpenAIConfig::default();
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Chat model served by an OpenAI-compatible endpoint.
pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiModel {
    /// Create a new model handle.
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, messages = request.messages.len(), tools = request.tools.len()))]
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(encode_messages(&request.system, &request.messages)?)
            .temperature(request.temperature)
            .max_completion_tokens(request.max_tokens);

        if !request.tools.is_empty() {
            builder.tools(encode_tools(&request.tools));
            if let Some(ToolChoice::Auto) = request.tool_choice {
                builder.tool_choice(ChatCompletionToolChoiceOption::Auto);
            }
        }

        let api_request = builder.build().map_err(|e| CoursemateError::Model(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(api_request)
            .await
            .map_err(|e| CoursemateError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| CoursemateError::Model("No response from model".to_string()))?;

        debug!(finish_reason = ?choice.finish_reason, "Received model response");

        decode_choice(
            choice.message.content.as_deref(),
            choice.message.tool_calls.as_deref().unwrap_or_default(),
            choice.finish_reason.clone(),
        )
    }
}

fn build_error(e: impl std::fmt::Display) -> CoursemateError {
    CoursemateError::Model(e.to_string())
}

/// Encode the system preamble and conversation as OpenAI messages.
fn encode_messages(system: &str, messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut encoded: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system)
            .build()
            .map_err(build_error)?
            .into(),
    ];

    for message in messages {
        match (message.role, &message.content) {
            (Role::User, MessageContent::Text(text)) => {
                encoded.push(user_message(text)?);
            }
            (Role::User, MessageContent::Blocks(blocks)) => {
                for block in blocks {
                    match block {
                        ContentBlock::ToolResult(result) => encoded.push(
                            ChatCompletionRequestToolMessageArgs::default()
                                .tool_call_id(&result.tool_use_id)
                                .content(result.content.clone())
                                .build()
                                .map_err(build_error)?
                                .into(),
                        ),
                        ContentBlock::Text { text } => encoded.push(user_message(text)?),
                        ContentBlock::ToolUse(_) => {
                            return Err(CoursemateError::Model(
                                "User messages cannot carry tool invocations".to_string(),
                            ))
                        }
                    }
                }
            }
            (Role::Assistant, MessageContent::Text(text)) => encoded.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(text.clone())
                    .build()
                    .map_err(build_error)?
                    .into(),
            ),
            (Role::Assistant, MessageContent::Blocks(blocks)) => {
                encoded.push(assistant_blocks_message(blocks)?);
            }
        }
    }

    Ok(encoded)
}

fn user_message(text: &str) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(text)
        .build()
        .map_err(build_error)?
        .into())
}

fn assistant_blocks_message(blocks: &[ContentBlock]) -> Result<ChatCompletionRequestMessage> {
    let text = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    let tool_calls: Vec<ChatCompletionMessageToolCall> = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse(tool_use) => Some(ChatCompletionMessageToolCall {
                id: tool_use.id.clone(),
                r#type: ChatCompletionToolType::Function,
                function: FunctionCall {
                    name: tool_use.name.clone(),
                    arguments: tool_use.input.to_string(),
                },
            }),
            _ => None,
        })
        .collect();

    let mut args = ChatCompletionRequestAssistantMessageArgs::default();
    if !text.is_empty() {
        args.content(text);
    }
    if !tool_calls.is_empty() {
        args.tool_calls(tool_calls);
    }

    Ok(args.build().map_err(build_error)?.into())
}

/// Encode tool definitions as OpenAI function tools.
fn encode_tools(tools: &[ToolDefinition]) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|tool| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.input_schema.clone()),
                strict: None,
            },
        })
        .collect()
}

/// Decode one completion choice into a `ModelResponse`.
fn decode_choice(
    content: Option<&str>,
    tool_calls: &[ChatCompletionMessageToolCall],
    finish_reason: Option<FinishReason>,
) -> Result<ModelResponse> {
    let mut blocks = Vec::with_capacity(tool_calls.len() + 1);

    if let Some(text) = content.filter(|t| !t.is_empty()) {
        blocks.push(ContentBlock::text(text));
    }

    for call in tool_calls {
        let input: serde_json::Value = if call.function.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                CoursemateError::Model(format!(
                    "Invalid arguments for tool '{}': {}",
                    call.function.name, e
                ))
            })?
        };
        blocks.push(ContentBlock::tool_use(&call.id, &call.function.name, input));
    }

    // Some compatible servers report `stop` alongside tool calls.
    let stop_reason = match finish_reason {
        _ if !tool_calls.is_empty() => StopReason::ToolUse,
        Some(FinishReason::ToolCalls | FinishReason::FunctionCall) => StopReason::ToolUse,
        Some(FinishReason::Stop) => StopReason::EndTurn,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        _ => StopReason::Other,
    };

    Ok(ModelResponse {
        stop_reason,
        content: blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolResult;
    use serde_json::json;

    fn tool_call(id: &str, name: &str, arguments: &str) -> ChatCompletionMessageToolCall {
        ChatCompletionMessageToolCall {
            id: id.to_string(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[test]
    fn test_decode_tool_calls() {
        let calls = [tool_call("call_1", "search_course_content", r#"{"query": "mcp"}"#)];
        let response = decode_choice(Some("Looking."), &calls, Some(FinishReason::ToolCalls)).unwrap();

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.first_text(), "Looking.");
        let uses: Vec<_> = response.tool_uses().collect();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].id, "call_1");
        assert_eq!(uses[0].input, json!({"query": "mcp"}));
    }

    #[test]
    fn test_decode_tool_calls_with_stop_finish_reason() {
        let calls = [tool_call("call_1", "get_course_outline", r#"{"course_name": "MCP"}"#)];
        let response = decode_choice(None, &calls, Some(FinishReason::Stop)).unwrap();

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.tool_uses().count(), 1);
    }

    #[test]
    fn test_decode_function_call_finish_reason() {
        let calls = [tool_call("call_1", "search_course_content", r#"{"query": "mcp"}"#)];
        let response = decode_choice(None, &calls, Some(FinishReason::FunctionCall)).unwrap();
        assert_eq!(response.stop_reason, StopReason::ToolUse);

        let response = decode_choice(None, &[], Some(FinishReason::FunctionCall)).unwrap();
        assert_eq!(response.stop_reason, StopReason::ToolUse);
    }

    #[test]
    fn test_decode_plain_answer() {
        let response = decode_choice(Some("Answer"), &[], Some(FinishReason::Stop)).unwrap();
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.content, vec![ContentBlock::text("Answer")]);
    }

    #[test]
    fn test_decode_rejects_malformed_arguments() {
        let calls = [tool_call("call_1", "search_course_content", "{not json")];
        assert!(decode_choice(None, &calls, Some(FinishReason::ToolCalls)).is_err());
    }

    #[test]
    fn test_encode_round_messages() {
        let messages = vec![
            Message::user("What is MCP?"),
            Message::assistant(vec![ContentBlock::tool_use(
                "call_1",
                "search_course_content",
                json!({"query": "MCP"}),
            )]),
            Message::tool_results(vec![ToolResult {
                tool_use_id: "call_1".to_string(),
                content: "[MCP - Lesson 1]\nMCP text".to_string(),
            }]),
        ];

        let encoded = encode_messages("system", &messages).unwrap();
        assert_eq!(encoded.len(), 4);
        assert!(matches!(encoded[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(encoded[1], ChatCompletionRequestMessage::User(_)));
        match &encoded[2] {
            ChatCompletionRequestMessage::Assistant(msg) => {
                let calls = msg.tool_calls.as_ref().unwrap();
                assert_eq!(calls[0].id, "call_1");
            }
            other => panic!("Expected assistant message, got {:?}", other),
        }
        match &encoded[3] {
            ChatCompletionRequestMessage::Tool(msg) => assert_eq!(msg.tool_call_id, "call_1"),
            other => panic!("Expected tool message, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_tools() {
        let tools = encode_tools(&[ToolDefinition::new("t", "desc", json!({"type": "object"}))]);
        assert_eq!(tools[0].function.name, "t");
        assert_eq!(tools[0].function.description.as_deref(), Some("desc"));
    }
}
