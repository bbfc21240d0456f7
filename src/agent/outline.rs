//! Course outline tool.

use super::tool::{parse_args, Tool};
use crate::error::Result;
use crate::knowledge::{Course, KnowledgeBase};
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Lists a course's title, link and lessons.
pub struct CourseOutlineTool {
    knowledge: Arc<dyn KnowledgeBase>,
}

impl CourseOutlineTool {
    pub fn new(knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

/// Render a course outline.
pub fn format_outline(course: &Course) -> String {
    let mut lines = vec![format!("Course: {}", course.title)];

    if let Some(link) = &course.link {
        lines.push(format!("Course Link: {}", link));
    }

    if course.lessons.is_empty() {
        lines.push("\nNo lessons found for this course.".to_string());
    } else {
        lines.push(format!("\nLessons ({} total):", course.lessons.len()));
        lines.extend(
            course
                .lessons
                .iter()
                .map(|lesson| format!("  Lesson {}: {}", lesson.number, lesson.title)),
        );
    }

    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            OUTLINE_TOOL_NAME,
            "Get the complete outline of a course including its title, link, and all lessons \
             with their numbers and titles. Use this for questions about course structure, \
             what lessons are in a course, or course overview.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title to get outline for (partial matches work, e.g. 'MCP', 'Introduction')"
                    }
                },
                "required": ["course_name"]
            }),
        )
    }

    async fn execute(&self, input: &serde_json::Value) -> Result<String> {
        let args: OutlineArgs = parse_args(OUTLINE_TOOL_NAME, input)?;

        let Some(title) = self.knowledge.resolve_course_name(&args.course_name).await? else {
            return Ok(format!("No course found matching '{}'", args.course_name));
        };

        match self.knowledge.get_course_metadata(&title).await {
            Ok(Some(course)) => Ok(format_outline(&course)),
            Ok(None) => Ok(format!("Could not retrieve metadata for course '{}'", title)),
            Err(e) => {
                warn!("Failed to read outline for '{}': {}", title, e);
                Ok(format!("Error retrieving course outline: {}", e))
            }
        }
    }
}
