//! Outline command implementation.

use crate::cli::setup::open_knowledge_base;
use crate::config::Settings;
use crate::agent::{CourseOutlineTool, Tool};
use anyhow::Result;

/// Print the outline of a course, resolved from a partial name.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    let knowledge = open_knowledge_base(&settings)?;
    let tool = CourseOutlineTool::new(knowledge);

    let outline = tool
        .execute(&serde_json::json!({ "course_name": course }))
        .await?;

    println!("{}", outline);
    Ok(())
}
