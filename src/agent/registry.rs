//! Tool registry: name lookup, dispatch, and citation aggregation.

use super::tool::{Citation, Tool, ToolDispatcher};
use crate::error::{CoursemateError, Result};
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Named tools in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its definition's name.
    ///
    /// Registering an existing name replaces the previous tool in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.definition().name;
        if name.trim().is_empty() {
            return Err(CoursemateError::Tool(
                "Tool must have a name in its definition".to_string(),
            ));
        }

        match self.tools.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => {
                debug!("Replacing tool: {}", name);
                entry.1 = tool;
            }
            None => {
                debug!("Registered tool: {}", name);
                self.tools.push((name, tool));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of all tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|(_, tool)| tool.definition()).collect()
    }

    /// Citations from the first tool (in registration order) that has any.
    pub fn last_citations(&self) -> Vec<Citation> {
        self.tools
            .iter()
            .filter_map(|(_, tool)| tool.citation_source())
            .map(|source| source.citations())
            .find(|citations| !citations.is_empty())
            .unwrap_or_default()
    }

    /// Clear stored citations on every citation-tracking tool.
    pub fn clear_citations(&self) {
        for source in self.tools.iter().filter_map(|(_, tool)| tool.citation_source()) {
            source.clear_citations();
        }
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    async fn dispatch(&self, name: &str, input: &serde_json::Value) -> Result<String> {
        let Some((_, tool)) = self.tools.iter().find(|(existing, _)| existing == name) else {
            info!("Model requested unknown tool: {}", name);
            return Ok(format!("Tool '{}' not found", name));
        };

        tool.execute(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::search::tests::{hit, StubKnowledge};
    use crate::agent::{CitationSource, CourseOutlineTool, CourseSearchTool};
    use crate::knowledge::RetrievalResult;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    struct EchoTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.name, "echo", json!({"type": "object"}))
        }

        async fn execute(&self, _input: &serde_json::Value) -> Result<String> {
            Ok(self.reply.to_string())
        }
    }

    struct FixedCitations(Mutex<Vec<Citation>>);

    #[async_trait]
    impl Tool for FixedCitations {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("fixed", "fixed citations", json!({"type": "object"}))
        }

        async fn execute(&self, _input: &serde_json::Value) -> Result<String> {
            Ok(String::new())
        }

        fn citation_source(&self) -> Option<&dyn CitationSource> {
            Some(self)
        }
    }

    impl CitationSource for FixedCitations {
        fn citations(&self) -> Vec<Citation> {
            self.0.lock().unwrap().clone()
        }

        fn clear_citations(&self) {
            self.0.lock().unwrap().clear();
        }
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let mut registry = ToolRegistry::new();
        let result = registry.register(Arc::new(EchoTool { name: "", reply: "" }));
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_last_registration_wins_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "a", reply: "first" })).unwrap();
        registry.register(Arc::new(EchoTool { name: "b", reply: "b" })).unwrap();
        registry.register(Arc::new(EchoTool { name: "a", reply: "second" })).unwrap();

        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.dispatch("a", &json!({})).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found_text() {
        let kb = Arc::new(StubKnowledge::with_result(RetrievalResult::default()));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(kb.clone()))).unwrap();

        let output = registry
            .dispatch("nonexistent", &json!({"query": "x"}))
            .await
            .unwrap();

        assert!(output.contains("not found"));
        assert_eq!(kb.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_citations_flow_through_registry() {
        let kb = Arc::new(StubKnowledge::with_result(RetrievalResult::from_hits(vec![hit(
            "C",
            Some(1),
            "doc text",
        )])));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(kb.clone()))).unwrap();
        registry.register(Arc::new(CourseOutlineTool::new(kb))).unwrap();

        assert!(registry.last_citations().is_empty());

        registry
            .dispatch("search_course_content", &json!({"query": "q"}))
            .await
            .unwrap();
        assert_eq!(registry.last_citations().len(), 1);

        registry.clear_citations();
        assert!(registry.last_citations().is_empty());
    }

    #[test]
    fn test_first_non_empty_citation_list_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "plain", reply: "" })).unwrap();
        registry
            .register(Arc::new(FixedCitations(Mutex::new(vec![Citation::new("X", None)]))))
            .unwrap();

        assert_eq!(registry.last_citations(), vec![Citation::new("X", None)]);

        registry.clear_citations();
        registry.clear_citations();
        assert!(registry.last_citations().is_empty());
    }
}
