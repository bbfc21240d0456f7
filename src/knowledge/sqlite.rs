//! SQLite-based knowledge base implementation.
//!
//! The course catalog and lesson chunks live in two tables. Filtering happens
//! in SQL; ranking is computed in Rust over the filtered candidates.

use super::{rank_chunks, Course, CourseChunk, KnowledgeBase, Lesson, RetrievalHit};
use crate::error::{CoursemateError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    title TEXT PRIMARY KEY,
    link TEXT,
    instructor TEXT,
    lessons_json TEXT NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    course_title TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    lesson_number INTEGER,
    content TEXT NOT NULL,
    PRIMARY KEY (course_title, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_lesson ON chunks(course_title, lesson_number);
"#;

/// SQLite-based knowledge base.
pub struct SqliteKnowledgeBase {
    conn: Mutex<Connection>,
    max_results: usize,
}

impl SqliteKnowledgeBase {
    /// Open (or create) a knowledge base file.
    #[instrument(skip_all)]
    pub fn new(path: &Path, max_results: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite knowledge base at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            max_results,
        })
    }

    /// Create an in-memory SQLite knowledge base (useful for testing).
    pub fn in_memory(max_results: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            max_results,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CoursemateError::KnowledgeBase(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl KnowledgeBase for SqliteKnowledgeBase {
    fn max_results(&self) -> usize {
        self.max_results
    }

    #[instrument(skip(self))]
    async fn query_chunks(
        &self,
        query: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
        limit: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT course_title, lesson_number, chunk_index, content
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            ORDER BY rowid
            "#,
        )?;

        let candidates = stmt
            .query_map(params![course_title, lesson_number], |row| {
                Ok(CourseChunk {
                    course_title: row.get(0)?,
                    lesson_number: row.get(1)?,
                    chunk_index: row.get(2)?,
                    content: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Ranking {} candidate chunks", candidates.len());

        Ok(rank_chunks(query, &candidates, limit))
    }

    async fn get_course_metadata(&self, course_title: &str) -> Result<Option<Course>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT title, link, instructor, lessons_json FROM courses WHERE title = ?1",
                params![course_title],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((title, link, instructor, lessons_json)) => {
                let lessons: Vec<Lesson> = serde_json::from_str(&lessons_json)?;
                Ok(Some(Course {
                    title,
                    link,
                    instructor,
                    lessons,
                }))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, course, chunks), fields(course = %course.title, chunks = chunks.len()))]
    async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<()> {
        let conn = self.lock()?;
        let lessons_json = serde_json::to_string(&course.lessons)?;

        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT OR REPLACE INTO courses (title, link, instructor, lessons_json, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                course.title,
                course.link,
                course.instructor,
                lessons_json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        tx.execute("DELETE FROM chunks WHERE course_title = ?1", params![course.title])?;

        for chunk in chunks {
            tx.execute(
                r#"
                INSERT INTO chunks (course_title, chunk_index, lesson_number, content)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    chunk.course_title,
                    chunk.chunk_index,
                    chunk.lesson_number,
                    chunk.content,
                ],
            )?;
        }

        tx.commit()?;
        info!("Indexed course with {} chunks", chunks.len());
        Ok(())
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY rowid")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM courses;")?;
        info!("Cleared knowledge base");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_with_lessons() -> (Course, Vec<CourseChunk>) {
        let mut course = Course::new("Advanced Retrieval for AI with Chroma");
        course.link = Some("https://example.com/chroma".to_string());
        course.instructor = Some("Anton".to_string());
        course.lessons = vec![
            Lesson {
                number: 1,
                title: "Overview of embeddings-based retrieval".to_string(),
                link: Some("https://example.com/chroma/1".to_string()),
            },
            Lesson {
                number: 2,
                title: "Pitfalls of retrieval".to_string(),
                link: None,
            },
        ];

        let chunks = vec![
            CourseChunk {
                course_title: course.title.clone(),
                lesson_number: Some(1),
                chunk_index: 0,
                content: "Embeddings map text to vectors for retrieval.".to_string(),
            },
            CourseChunk {
                course_title: course.title.clone(),
                lesson_number: Some(2),
                chunk_index: 1,
                content: "Retrieval can return distractors.".to_string(),
            },
        ];

        (course, chunks)
    }

    #[tokio::test]
    async fn test_sqlite_roundtrip_and_search() {
        let kb = SqliteKnowledgeBase::in_memory(5).unwrap();
        let (course, chunks) = course_with_lessons();
        kb.add_course(&course, &chunks).await.unwrap();

        assert_eq!(kb.course_titles().await.unwrap(), vec![course.title.clone()]);
        assert_eq!(kb.get_course_metadata(&course.title).await.unwrap(), Some(course.clone()));
        assert_eq!(kb.get_course_metadata("Missing").await.unwrap(), None);

        let result = kb.search("retrieval", Some("chroma"), Some(2)).await.unwrap();
        assert_eq!(result.hits().len(), 1);
        assert_eq!(result.hits()[0].document, "Retrieval can return distractors.");

        let result = kb.search("retrieval", None, None).await.unwrap();
        assert_eq!(result.hits().len(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb").join("courses.db");
        let (course, chunks) = course_with_lessons();

        {
            let kb = SqliteKnowledgeBase::new(&path, 5).unwrap();
            kb.add_course(&course, &chunks).await.unwrap();
        }

        let kb = SqliteKnowledgeBase::new(&path, 5).unwrap();
        assert_eq!(
            kb.get_lesson_link(&course.title, 1).await.unwrap().as_deref(),
            Some("https://example.com/chroma/1")
        );

        kb.clear().await.unwrap();
        assert!(kb.course_titles().await.unwrap().is_empty());
    }
}
