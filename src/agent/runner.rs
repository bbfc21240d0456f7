//! Bounded tool-calling loop between the model and the tool registry.

use super::tool::ToolDispatcher;
use crate::error::Result;
use crate::llm::{
    LanguageModel, Message, ModelRequest, ModelResponse, ToolChoice, ToolDefinition, ToolResult,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Maximum number of tool-enabled model calls per query.
pub const MAX_TOOL_ROUNDS: usize = 2;

/// Default output cap for each model call.
pub const DEFAULT_MAX_TOKENS: u32 = 800;

/// Drives one query through at most `MAX_TOOL_ROUNDS` tool rounds.
pub struct Generator {
    model: Arc<dyn LanguageModel>,
    system_prompt: String,
    max_tokens: u32,
}

impl Generator {
    /// Create a generator with the given model and instructional preamble.
    pub fn new(model: Arc<dyn LanguageModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the per-call output cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Answer `query`, calling tools when the model asks for them.
    ///
    /// Tools are offered only when `tools` is non-empty. Every round that ends in
    /// a tool request is dispatched through `dispatcher`; after
    /// `MAX_TOOL_ROUNDS` such rounds one last call is made without tools.
    /// A failing tool ends the query with whatever text the model already
    /// produced, or an apology naming the failure.
    #[instrument(skip_all, fields(model = self.model.name()))]
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        dispatcher: Option<&dyn ToolDispatcher>,
    ) -> Result<String> {
        let system = match history {
            Some(history) if !history.is_empty() => {
                format!("{}\n\nPrevious conversation:\n{}", self.system_prompt, history)
            }
            _ => self.system_prompt.clone(),
        };
        let tools = tools.filter(|t| !t.is_empty());

        let mut messages = vec![Message::user(query)];

        for round in 0..MAX_TOOL_ROUNDS {
            debug!(round, messages = messages.len(), "Calling model");
            let response = self.call(&system, &messages, tools).await?;

            if !response.stop_reason.is_tool_use() {
                info!(round, "Model answered without tools");
                return Ok(response.first_text());
            }

            let Some(dispatcher) = dispatcher else {
                info!(round, "Tool requested but no dispatcher available");
                return Ok(response.first_text());
            };

            let results = match dispatch_all(&response, dispatcher).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(round, "Tool execution failed: {}", e);
                    let text = response.first_text();
                    if text.is_empty() {
                        return Ok(format!(
                            "I encountered an issue while searching for information: {}",
                            e
                        ));
                    }
                    return Ok(text);
                }
            };

            messages.push(Message::assistant(response.content));
            messages.push(Message::tool_results(results));
        }

        info!("Tool round limit reached, requesting final answer");
        let response = self.call(&system, &messages, None).await?;
        Ok(response.first_text())
    }

    async fn call(
        &self,
        system: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ModelResponse> {
        let request = ModelRequest {
            system: system.to_string(),
            messages: messages.to_vec(),
            tools: tools.map(<[ToolDefinition]>::to_vec).unwrap_or_default(),
            tool_choice: tools.map(|_| ToolChoice::Auto),
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        self.model.complete(&request).await
    }
}

/// Run every tool invocation in order, stopping at the first failure.
async fn dispatch_all(
    response: &ModelResponse,
    dispatcher: &dyn ToolDispatcher,
) -> Result<Vec<ToolResult>> {
    let mut results = Vec::new();

    for tool_use in response.tool_uses() {
        info!("Calling tool: {} with args: {}", tool_use.name, tool_use.input);
        let content = dispatcher.dispatch(&tool_use.name, &tool_use.input).await?;
        results.push(ToolResult {
            tool_use_id: tool_use.id.clone(),
            content,
        });
    }

    Ok(results)
}
