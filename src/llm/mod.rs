//! Language model abstraction for Coursemate.
//!
//! Defines the conversation model exchanged with a chat endpoint (messages,
//! content blocks, tool schemas) and the `LanguageModel` trait that concrete
//! providers implement. Provider wire formats are decoded into these types
//! once, at the provider boundary.

mod openai;
mod scripted;

pub use openai::{create_client, create_client_with_timeout, OpenAiModel};
pub use scripted::ScriptedModel;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A tool invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Unique invocation identifier.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Named arguments (a JSON object).
    pub input: serde_json::Value,
}

/// The outcome of dispatching one `ToolUse`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Identifier of the invocation this result answers.
    pub tool_use_id: String,
    /// Textual tool output.
    pub content: String,
}

/// A single block of structured message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse(ToolUse),
    ToolResult(ToolResult),
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Create a tool invocation block.
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        ContentBlock::ToolUse(ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        })
    }

    /// Create a tool result block.
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentBlock::ToolResult(ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
        })
    }
}

/// Message payload: plain text or a list of content blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One entry in the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// A user message holding plain text.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// An assistant message holding the model's raw content blocks.
    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// A user message carrying tool results back to the model.
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(
                results.into_iter().map(ContentBlock::ToolResult).collect(),
            ),
        }
    }
}

/// Model-facing description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, unique within a registry.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON schema of the tool's input object.
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// How the model may choose tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    Auto,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    Other,
}

impl StopReason {
    /// Whether the model is asking for tool execution.
    pub fn is_tool_use(self) -> bool {
        self == StopReason::ToolUse
    }
}

/// A single call to the model endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRequest {
    /// Instructional preamble (system prompt).
    pub system: String,
    /// Accumulated conversation, oldest first.
    pub messages: Vec<Message>,
    /// Tools advertised to the model; empty for a text-only call.
    pub tools: Vec<ToolDefinition>,
    /// Tool selection mode; `None` whenever `tools` is empty.
    pub tool_choice: Option<ToolChoice>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The model's structured reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
}

impl ModelResponse {
    /// A plain text answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            stop_reason: StopReason::EndTurn,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// A response requesting tool use.
    pub fn tool_request(content: Vec<ContentBlock>) -> Self {
        Self {
            stop_reason: StopReason::ToolUse,
            content,
        }
    }

    /// The first text block, or an empty string when there is none.
    pub fn first_text(&self) -> String {
        self.content
            .iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Tool invocations in the order the model emitted them.
    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUse> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse(tool_use) => Some(tool_use),
            _ => None,
        })
    }
}

/// Trait for chat model endpoints.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider/model identifier for logging.
    fn name(&self) -> &str;

    /// Send one request and wait for the complete response.
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_block_wire_shape() {
        let block = ContentBlock::tool_use("tool_1", "search_course_content", json!({"query": "mcp"}));
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "tool_use");
        assert_eq!(value["id"], "tool_1");
        assert_eq!(value["input"]["query"], "mcp");

        let parsed: ContentBlock =
            serde_json::from_value(json!({"type": "text", "text": "hello"})).unwrap();
        assert_eq!(parsed, ContentBlock::text("hello"));
    }

    #[test]
    fn test_first_text_skips_tool_blocks() {
        let response = ModelResponse::tool_request(vec![
            ContentBlock::tool_use("t1", "x", json!({})),
            ContentBlock::text("Let me check."),
            ContentBlock::text("Second"),
        ]);
        assert_eq!(response.first_text(), "Let me check.");
        assert_eq!(response.tool_uses().count(), 1);
    }

    #[test]
    fn test_first_text_empty_when_absent() {
        let response = ModelResponse::tool_request(vec![]);
        assert_eq!(response.first_text(), "");
    }

    #[test]
    fn test_tool_choice_serializes_as_auto() {
        assert_eq!(serde_json::to_value(ToolChoice::Auto).unwrap(), json!({"type": "auto"}));
    }
}
