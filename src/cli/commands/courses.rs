//! Courses command implementation.

use crate::cli::setup::open_knowledge_base;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// List indexed courses.
pub async fn run_courses(settings: Settings) -> Result<()> {
    let knowledge = open_knowledge_base(&settings)?;

    let titles = match knowledge.course_titles().await {
        Ok(titles) => titles,
        Err(e) => {
            Output::error(&format!("Failed to list courses: {}", e));
            return Err(e.into());
        }
    };

    if titles.is_empty() {
        Output::info("No courses indexed yet. Use 'coursemate ingest <dir>' to add course documents.");
        return Ok(());
    }

    Output::header(&format!("Indexed Courses ({})", titles.len()));
    println!();

    for title in &titles {
        match knowledge.get_course_metadata(title).await? {
            Some(course) => {
                Output::list_item(&format!("{} ({} lessons)", course.title, course.lessons.len()));
                if let Some(instructor) = &course.instructor {
                    Output::kv("    Instructor", instructor);
                }
            }
            None => Output::list_item(title),
        }
    }

    Ok(())
}
