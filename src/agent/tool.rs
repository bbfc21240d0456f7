//! Tool contract shared by every capability the model can invoke.

use crate::error::{CoursemateError, Result};
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use std::fmt;

/// A rendered reference to a retrieved source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// `<course title>` or `<course title> - Lesson <n>`.
    pub label: String,
    /// Lesson URL, when the knowledge base knows one.
    pub link: Option<String>,
}

impl Citation {
    pub fn new(label: impl Into<String>, link: Option<String>) -> Self {
        Self {
            label: label.into(),
            link,
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.link {
            Some(link) => write!(f, "[{}]({})", self.label, link),
            None => write!(f, "{}", self.label),
        }
    }
}

impl Serialize for Citation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Implemented by tools that remember the sources behind their last output.
pub trait CitationSource: Send + Sync {
    /// Citations stored by the most recent invocation.
    fn citations(&self) -> Vec<Citation>;

    /// Forget stored citations.
    fn clear_citations(&self);
}

/// A named capability the model can call.
///
/// `execute` reports "nothing found" style outcomes as text; `Err` is reserved
/// for failures of the underlying collaborator or unusable arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Model-facing definition. The name is the registry key.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-supplied argument object.
    async fn execute(&self, input: &serde_json::Value) -> Result<String>;

    /// Citation tracking, for tools that support it.
    fn citation_source(&self) -> Option<&dyn CitationSource> {
        None
    }
}

/// Executes tools by name on behalf of the orchestration loop.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    async fn dispatch(&self, name: &str, input: &serde_json::Value) -> Result<String>;
}

/// Decode a tool's argument object.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, input: &serde_json::Value) -> Result<T> {
    serde_json::from_value(input.clone())
        .map_err(|e| CoursemateError::InvalidInput(format!("Invalid arguments for {}: {}", tool, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_display() {
        let linked = Citation::new("MCP - Lesson 1", Some("https://example.com/1".to_string()));
        assert_eq!(linked.to_string(), "[MCP - Lesson 1](https://example.com/1)");

        let plain = Citation::new("MCP", None);
        assert_eq!(plain.to_string(), "MCP");
    }

    #[test]
    fn test_citation_serializes_as_rendered_string() {
        let citation = Citation::new("MCP - Lesson 2", Some("https://example.com/2".to_string()));
        assert_eq!(
            serde_json::to_value(&citation).unwrap(),
            serde_json::json!("[MCP - Lesson 2](https://example.com/2)")
        );
    }

    #[test]
    fn test_parse_args_reports_tool_name() {
        #[derive(Debug, serde::Deserialize)]
        struct Args {
            #[allow(dead_code)]
            query: String,
        }

        let err = parse_args::<Args>("search_course_content", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, CoursemateError::InvalidInput(_)));
        assert!(err.to_string().contains("search_course_content"));
    }
}
