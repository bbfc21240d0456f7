//! In-memory knowledge base implementation.
//!
//! Useful for testing and small course sets.

use super::{rank_chunks, Course, CourseChunk, KnowledgeBase, RetrievalHit};
use crate::error::{CoursemateError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

#[derive(Default)]
struct Contents {
    courses: Vec<Course>,
    chunks: Vec<CourseChunk>,
}

/// In-memory knowledge base.
pub struct MemoryKnowledgeBase {
    contents: RwLock<Contents>,
    max_results: usize,
}

impl MemoryKnowledgeBase {
    /// Create an empty knowledge base returning at most `max_results` hits.
    pub fn new(max_results: usize) -> Self {
        Self {
            contents: RwLock::new(Contents::default()),
            max_results,
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Contents>> {
        self.contents
            .read()
            .map_err(|e| CoursemateError::KnowledgeBase(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Contents>> {
        self.contents
            .write()
            .map_err(|e| CoursemateError::KnowledgeBase(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryKnowledgeBase {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl KnowledgeBase for MemoryKnowledgeBase {
    fn max_results(&self) -> usize {
        self.max_results
    }

    async fn query_chunks(
        &self,
        query: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
        limit: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let contents = self.read()?;

        let candidates = contents.chunks.iter().filter(|c| {
            course_title.is_none_or(|t| c.course_title == t)
                && lesson_number.is_none_or(|n| c.lesson_number == Some(n))
        });

        Ok(rank_chunks(query, candidates, limit))
    }

    async fn get_course_metadata(&self, course_title: &str) -> Result<Option<Course>> {
        let contents = self.read()?;
        Ok(contents.courses.iter().find(|c| c.title == course_title).cloned())
    }

    async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<()> {
        let mut contents = self.write()?;

        contents.chunks.retain(|c| c.course_title != course.title);
        contents.chunks.extend_from_slice(chunks);

        match contents.courses.iter_mut().find(|c| c.title == course.title) {
            Some(existing) => *existing = course.clone(),
            None => contents.courses.push(course.clone()),
        }

        Ok(())
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let contents = self.read()?;
        Ok(contents.courses.iter().map(|c| c.title.clone()).collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut contents = self.write()?;
        contents.courses.clear();
        contents.chunks.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Lesson;

    fn sample_course() -> (Course, Vec<CourseChunk>) {
        let mut course = Course::new("MCP: Build Rich-Context AI Apps");
        course.link = Some("https://example.com/mcp".to_string());
        course.lessons = vec![
            Lesson {
                number: 0,
                title: "Introduction".to_string(),
                link: Some("https://example.com/mcp/0".to_string()),
            },
            Lesson {
                number: 1,
                title: "Servers".to_string(),
                link: None,
            },
        ];

        let chunks = vec![
            CourseChunk {
                course_title: course.title.clone(),
                lesson_number: Some(0),
                chunk_index: 0,
                content: "MCP connects models to tools.".to_string(),
            },
            CourseChunk {
                course_title: course.title.clone(),
                lesson_number: Some(1),
                chunk_index: 1,
                content: "An MCP server exposes tools and resources.".to_string(),
            },
        ];

        (course, chunks)
    }

    #[tokio::test]
    async fn test_search_with_filters() {
        let kb = MemoryKnowledgeBase::default();
        let (course, chunks) = sample_course();
        kb.add_course(&course, &chunks).await.unwrap();

        let all = kb.search("MCP tools", None, None).await.unwrap();
        assert_eq!(all.hits().len(), 2);

        let lesson = kb.search("MCP tools", Some("mcp"), Some(1)).await.unwrap();
        assert_eq!(lesson.hits().len(), 1);
        assert_eq!(lesson.hits()[0].metadata.lesson_number, Some(1));
    }

    #[tokio::test]
    async fn test_unknown_course_filter_is_error_result() {
        let kb = MemoryKnowledgeBase::default();
        let (course, chunks) = sample_course();
        kb.add_course(&course, &chunks).await.unwrap();

        let result = kb.search("tools", Some("Cooking"), None).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.error(), Some("No course found matching 'Cooking'"));
    }

    #[tokio::test]
    async fn test_no_matches_is_not_an_error() {
        let kb = MemoryKnowledgeBase::default();
        let (course, chunks) = sample_course();
        kb.add_course(&course, &chunks).await.unwrap();

        let result = kb.search("pasta recipes", None, None).await.unwrap();
        assert!(result.is_empty());
        assert!(result.error().is_none());
    }

    #[tokio::test]
    async fn test_lesson_link_and_metadata() {
        let kb = MemoryKnowledgeBase::default();
        let (course, chunks) = sample_course();
        kb.add_course(&course, &chunks).await.unwrap();

        assert_eq!(
            kb.get_lesson_link(&course.title, 0).await.unwrap().as_deref(),
            Some("https://example.com/mcp/0")
        );
        assert_eq!(kb.get_lesson_link(&course.title, 1).await.unwrap(), None);
        assert_eq!(kb.get_course_metadata(&course.title).await.unwrap(), Some(course));
    }

    #[tokio::test]
    async fn test_re_adding_course_replaces_chunks() {
        let kb = MemoryKnowledgeBase::default();
        let (course, chunks) = sample_course();
        kb.add_course(&course, &chunks).await.unwrap();
        kb.add_course(&course, &chunks[..1]).await.unwrap();

        assert_eq!(kb.course_titles().await.unwrap().len(), 1);
        assert_eq!(kb.search("MCP", None, None).await.unwrap().hits().len(), 1);

        kb.clear().await.unwrap();
        assert!(kb.course_titles().await.unwrap().is_empty());
    }
}
