//! Prompt templates for Coursemate.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub generator: GeneratorPrompts,
}

/// Prompts for tool-assisted answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorPrompts {
    /// Instructional preamble sent with every model call.
    pub system: String,
    /// Wraps the user's question before it enters the conversation.
    pub query: String,
}

impl Default for GeneratorPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant for course materials and educational content, with tools for looking up course information.

Available tools:
1. **search_course_content**: search the text of course lessons
2. **get_course_outline**: get a course's structure: title, course link, and every lesson (number and title)

Tool usage:
- Use **get_course_outline** for questions about course structure, which lessons exist, or what a course covers overall
- Use **search_course_content** for questions about specific material inside a course
- **Up to 2 sequential tool calls allowed per query**
- Make a second call only when the first result is insufficient or you need a different source
- Build answers from tool results only; do not invent course facts
- If a tool finds nothing, say so plainly and do not suggest alternatives

Outline answers:
- Include the course title, the course link, and the complete lesson list
- Give each lesson's number and title

Answering:
- General knowledge questions: answer directly without tools
- Course-specific questions: use the right tool first, then answer
- No meta-commentary: never describe your search process or mention "the search results"

Every answer must be brief, educational, clear, and supported by an example when one helps.
Provide only the direct answer to what was asked."#
                .to_string(),

            query: "Answer this question about course materials: {{query}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, applying overrides from `custom_dir/generator.toml` if present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let generator_path = custom_path.join("generator.toml");
            if generator_path.exists() {
                let content = std::fs::read_to_string(&generator_path)?;
                prompts.generator = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render the query wrapper for a user question.
    pub fn render_query(&self, query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        Self::render(&self.generator.query, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_allows_two_tool_calls() {
        let prompts = Prompts::default();
        assert!(prompts.generator.system.contains("2 sequential tool calls"));
        assert!(prompts.generator.system.contains("search_course_content"));
        assert!(prompts.generator.system.contains("get_course_outline"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_render_query() {
        let prompts = Prompts::default();
        assert_eq!(
            prompts.render_query("What is MCP?"),
            "Answer this question about course materials: What is MCP?"
        );
    }

    #[test]
    fn test_custom_dir_overrides_generator() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("generator.toml"),
            "system = \"Custom preamble\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.generator.system, "Custom preamble");
        assert!(prompts.generator.query.contains("{{query}}"));
    }
}
