//! Course content search tool.

use super::tool::{parse_args, Citation, CitationSource, Tool};
use crate::error::Result;
use crate::knowledge::{KnowledgeBase, RetrievalHit};
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument, warn};

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default, deserialize_with = "lesson_number")]
    lesson_number: Option<u32>,
}

/// Accepts `3` as well as `"3"`; a blank string means no filter.
fn lesson_number<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text.trim().parse().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("invalid lesson number '{}'", text))
        }),
    }
}

/// Searches lesson content, optionally filtered by course and lesson.
///
/// Remembers one citation per rendered result until the next search or an
/// explicit clear.
pub struct CourseSearchTool {
    knowledge: Arc<dyn KnowledgeBase>,
    last_citations: Mutex<Vec<Citation>>,
}

impl CourseSearchTool {
    pub fn new(knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            knowledge,
            last_citations: Mutex::new(Vec::new()),
        }
    }

    fn store_citations(&self, citations: Vec<Citation>) {
        *self
            .last_citations
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = citations;
    }

    /// Link for a cited lesson; lookup failures degrade to a plain citation.
    async fn lesson_link(&self, title: &str, lesson_number: u32) -> Option<String> {
        match self.knowledge.get_lesson_link(title, lesson_number).await {
            Ok(link) => link,
            Err(e) => {
                warn!("Lesson link lookup failed for '{}' lesson {}: {}", title, lesson_number, e);
                None
            }
        }
    }

    async fn format_hits(&self, hits: &[RetrievalHit]) -> (String, Vec<Citation>) {
        let mut sections = Vec::with_capacity(hits.len());
        let mut citations = Vec::with_capacity(hits.len());

        for hit in hits {
            let title = &hit.metadata.course_title;
            let label = match hit.metadata.lesson_number {
                Some(n) => format!("{} - Lesson {}", title, n),
                None => title.clone(),
            };

            let link = match hit.metadata.lesson_number {
                Some(n) => self.lesson_link(title, n).await,
                None => None,
            };

            sections.push(format!("[{}]\n{}", label, hit.document));
            citations.push(Citation::new(label, link));
        }

        (sections.join("\n\n"), citations)
    }
}

/// Describe the active filters for a "nothing found" message.
fn filter_description(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut info = String::new();
    if let Some(course) = course_name {
        info.push_str(&format!(" in course '{}'", course));
    }
    if let Some(lesson) = lesson_number {
        info.push_str(&format!(" in lesson {}", lesson));
    }
    info
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            SEARCH_TOOL_NAME,
            "Search course materials with smart course name matching and lesson filtering",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        )
    }

    #[instrument(skip(self, input), name = "search_tool")]
    async fn execute(&self, input: &serde_json::Value) -> Result<String> {
        let args: SearchArgs = parse_args(SEARCH_TOOL_NAME, input)?;
        let course_name = args.course_name.as_deref().filter(|c| !c.trim().is_empty());

        let result = self
            .knowledge
            .search(&args.query, course_name, args.lesson_number)
            .await?;

        if let Some(error) = result.error() {
            debug!(error, "Search reported an error");
            self.store_citations(Vec::new());
            return Ok(error.to_string());
        }

        if result.is_empty() {
            self.store_citations(Vec::new());
            return Ok(format!(
                "No relevant content found{}.",
                filter_description(course_name, args.lesson_number)
            ));
        }

        let (text, citations) = self.format_hits(result.hits()).await;
        debug!(results = citations.len(), "Search returned results");
        self.store_citations(citations);
        Ok(text)
    }

    fn citation_source(&self) -> Option<&dyn CitationSource> {
        Some(self)
    }
}

impl CitationSource for CourseSearchTool {
    fn citations(&self) -> Vec<Citation> {
        self.last_citations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear_citations(&self) {
        self.store_citations(Vec::new());
    }
}
