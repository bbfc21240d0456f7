//! Scripted language model.
//!
//! Replays a queue of canned responses and records every request it receives.
//! Useful for tests and for running the pipeline without network access.

use super::{LanguageModel, ModelRequest, ModelResponse};
use crate::error::{CoursemateError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Language model that answers from a pre-recorded script.
pub struct ScriptedModel {
    script: Mutex<VecDeque<std::result::Result<ModelResponse, String>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    /// Create a model that will return `responses` in order.
    pub fn new(responses: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another response.
    pub fn push(&self, response: ModelResponse) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(response));
    }

    /// Queue an endpoint failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(message.into()));
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(CoursemateError::Model(message)),
            None => Err(CoursemateError::Model("Script exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn request() -> ModelRequest {
        ModelRequest {
            system: "sys".to_string(),
            messages: vec![Message::user("hi")],
            tools: Vec::new(),
            tool_choice: None,
            temperature: 0.0,
            max_tokens: 10,
        }
    }

    #[test]
    fn test_replays_in_order_then_errors() {
        let model = ScriptedModel::new([ModelResponse::text("one")]);
        model.push_error("boom");

        tokio_test::block_on(async {
            assert_eq!(model.complete(&request()).await.unwrap().first_text(), "one");
            assert!(model.complete(&request()).await.is_err());
            assert!(model.complete(&request()).await.is_err());
        });

        assert_eq!(model.call_count(), 3);
        assert_eq!(model.requests()[0].system, "sys");
    }
}
