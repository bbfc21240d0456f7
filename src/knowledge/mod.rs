//! Course knowledge base abstraction.
//!
//! Stores course catalog entries (title, link, lessons) and lesson text
//! chunks, and answers filtered retrieval queries over them. Ranking is a
//! plain lexical term-overlap score; backends only differ in where the
//! catalog and chunks live.

mod memory;
mod sqlite;

pub use memory::MemoryKnowledgeBase;
pub use sqlite::SqliteKnowledgeBase;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Catalog entry for a course. The title doubles as its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    /// Lessons in stored order.
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Create a course with no link, instructor, or lessons.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    /// Link for a lesson number, if the lesson exists and has one.
    pub fn lesson_link(&self, lesson_number: u32) -> Option<&str> {
        self.lessons
            .iter()
            .find(|l| l.number == lesson_number)
            .and_then(|l| l.link.as_deref())
    }
}

/// A searchable slice of lesson text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    /// Position of this chunk within the course.
    pub chunk_index: u32,
    pub content: String,
}

/// Metadata attached to a retrieved chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: u32,
}

/// One ranked retrieval row.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub document: String,
    pub metadata: ChunkMetadata,
    /// Relevance score in `0.0..=1.0`, higher is better.
    pub score: f32,
}

impl RetrievalHit {
    fn from_chunk(chunk: &CourseChunk, score: f32) -> Self {
        Self {
            document: chunk.content.clone(),
            metadata: ChunkMetadata {
                course_title: chunk.course_title.clone(),
                lesson_number: chunk.lesson_number,
                chunk_index: chunk.chunk_index,
            },
            score,
        }
    }
}

/// Outcome of a knowledge base search.
///
/// When `error` is set there are no hits. An empty hit list without an error
/// means nothing matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    hits: Vec<RetrievalHit>,
    error: Option<String>,
}

impl RetrievalResult {
    /// A successful result (possibly empty).
    pub fn from_hits(hits: Vec<RetrievalHit>) -> Self {
        Self { hits, error: None }
    }

    /// A failed search.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn hits(&self) -> &[RetrievalHit] {
        &self.hits
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Trait for course knowledge base implementations.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Maximum number of hits returned by `search`.
    fn max_results(&self) -> usize;

    /// Rank chunks for `query`, restricted to an exact course title and/or lesson.
    async fn query_chunks(
        &self,
        query: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
        limit: usize,
    ) -> Result<Vec<RetrievalHit>>;

    /// Fetch the catalog entry stored under an exact course title.
    async fn get_course_metadata(&self, course_title: &str) -> Result<Option<Course>>;

    /// Add (or replace) a course and its chunks.
    async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<()>;

    /// Titles of all stored courses.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Remove every course and chunk.
    async fn clear(&self) -> Result<()>;

    /// Search with optional fuzzy course filter and lesson filter.
    ///
    /// An unresolvable course name and backend failures are reported through
    /// `RetrievalResult::error`, not as `Err`.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<RetrievalResult> {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(RetrievalResult::failed(format!(
                        "No course found matching '{}'",
                        name
                    )))
                }
            },
            None => None,
        };

        match self
            .query_chunks(query, course_title.as_deref(), lesson_number, self.max_results())
            .await
        {
            Ok(hits) => {
                debug!(hits = hits.len(), ?course_title, ?lesson_number, "Search complete");
                Ok(RetrievalResult::from_hits(hits))
            }
            Err(e) => Ok(RetrievalResult::failed(format!("Search error: {}", e))),
        }
    }

    /// Resolve a partial course name to a stored title.
    async fn resolve_course_name(&self, partial: &str) -> Result<Option<String>> {
        let titles = self.course_titles().await?;
        Ok(best_title_match(partial, &titles))
    }

    /// Link for a lesson of a course, if known.
    async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        Ok(self
            .get_course_metadata(course_title)
            .await?
            .and_then(|course| course.lesson_link(lesson_number).map(str::to_string)))
    }
}

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how",
    "in", "is", "it", "of", "on", "or", "that", "the", "this", "to", "what", "when", "which",
    "who", "why", "with",
];

/// Lowercased content terms of `text`, without stopwords.
pub fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Fraction of the query's terms present in `text`.
pub fn overlap_score(query_terms: &HashSet<String>, text: &str) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let text_terms = terms(text);
    let shared = query_terms.iter().filter(|t| text_terms.contains(*t)).count();
    shared as f32 / query_terms.len() as f32
}

/// Rank chunks against a query, dropping non-matching chunks.
///
/// Ties keep the input order.
pub fn rank_chunks<'a>(
    query: &str,
    chunks: impl IntoIterator<Item = &'a CourseChunk>,
    limit: usize,
) -> Vec<RetrievalHit> {
    let query_terms = terms(query);

    let mut hits: Vec<RetrievalHit> = chunks
        .into_iter()
        .map(|chunk| RetrievalHit::from_chunk(chunk, overlap_score(&query_terms, &chunk.content)))
        .filter(|hit| hit.score > 0.0)
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}

/// Pick the stored title best matching a partial course name.
///
/// Exact (case-insensitive) match wins, then substring containment, then the
/// highest term overlap. Returns `None` when nothing overlaps at all.
pub fn best_title_match(partial: &str, titles: &[String]) -> Option<String> {
    let needle = partial.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(title) = titles.iter().find(|t| t.to_lowercase() == needle) {
        return Some(title.clone());
    }

    if let Some(title) = titles.iter().find(|t| t.to_lowercase().contains(&needle)) {
        return Some(title.clone());
    }

    let query_terms = terms(partial);
    titles
        .iter()
        .map(|t| (t, overlap_score(&query_terms, t)))
        .filter(|(_, score)| *score > 0.0)
        .fold(None, |best: Option<(&String, f32)>, (title, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((title, score)),
        })
        .map(|(title, _)| title.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(title: &str, lesson: Option<u32>, index: u32, content: &str) -> CourseChunk {
        CourseChunk {
            course_title: title.to_string(),
            lesson_number: lesson,
            chunk_index: index,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_terms_drop_stopwords_and_case() {
        let t = terms("What is the MCP Server?");
        assert!(t.contains("mcp"));
        assert!(t.contains("server"));
        assert!(!t.contains("the"));
        assert!(!t.contains("what"));
    }

    #[test]
    fn test_rank_chunks_orders_by_overlap() {
        let chunks = vec![
            chunk("A", Some(1), 0, "Servers expose tools."),
            chunk("A", Some(1), 1, "MCP servers expose tools to clients."),
            chunk("A", Some(2), 2, "Unrelated cooking content."),
        ];

        let hits = rank_chunks("MCP servers", &chunks, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.chunk_index, 1);
        assert!((hits[0].score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rank_chunks_respects_limit() {
        let chunks: Vec<_> = (0..10).map(|i| chunk("A", None, i, "retrieval text")).collect();
        assert_eq!(rank_chunks("retrieval", &chunks, 3).len(), 3);
    }

    #[test]
    fn test_best_title_match() {
        let titles = vec![
            "MCP: Build Rich-Context AI Apps with Anthropic".to_string(),
            "Advanced Retrieval for AI with Chroma".to_string(),
        ];

        assert_eq!(
            best_title_match("mcp", &titles).as_deref(),
            Some("MCP: Build Rich-Context AI Apps with Anthropic")
        );
        assert_eq!(
            best_title_match("retrieval chroma", &titles).as_deref(),
            Some("Advanced Retrieval for AI with Chroma")
        );
        assert_eq!(best_title_match("quantum physics", &titles), None);
        assert_eq!(best_title_match("   ", &titles), None);
    }

    #[test]
    fn test_failed_result_is_empty() {
        let result = RetrievalResult::failed("boom");
        assert!(result.is_empty());
        assert_eq!(result.error(), Some("boom"));
    }
}
