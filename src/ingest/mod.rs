//! Course document ingestion.
//!
//! Course files are plain text with a small header followed by lesson
//! sections:
//!
//! ```text
//! Course Title: Building Towards Computer Use
//! Course Link: https://example.com/course
//! Course Instructor: Colt Steele
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/course/lesson0
//! Lesson body text...
//! ```

mod chunking;

pub use chunking::{split_sentences, SentenceChunker};

use crate::error::{CoursemateError, Result};
use crate::knowledge::{Course, CourseChunk, KnowledgeBase, Lesson};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, instrument, warn};

/// File extensions treated as course documents.
pub const COURSE_EXTENSIONS: &[&str] = &["txt", "md"];

fn lesson_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"^Lesson\s+(\d+):\s*(.*)$").expect("static regex"))
}

/// Keep `raw` only if it parses as an absolute URL.
fn valid_link(raw: &str, context: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match url::Url::parse(raw) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            warn!("Dropping invalid link for {}: {} ({})", context, raw, e);
            None
        }
    }
}

fn header_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key).map(str::trim)
}

struct Section {
    lesson: Option<u32>,
    lines: Vec<String>,
}

/// Parse one course document into its catalog entry and content chunks.
#[instrument(skip_all)]
pub fn parse_course_document(text: &str, chunker: &SentenceChunker) -> Result<(Course, Vec<CourseChunk>)> {
    let mut lines = text.lines().map(str::trim_end).peekable();

    let mut title: Option<String> = None;
    let mut link = None;
    let mut instructor = None;

    // Header lines, then the first non-header line doubles as a title if none was given.
    while let Some(&line) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.next();
            continue;
        }

        if let Some(value) = header_value(trimmed, "Course Title:") {
            title = Some(value.to_string());
        } else if let Some(value) = header_value(trimmed, "Course Link:") {
            link = valid_link(value, "course");
        } else if let Some(value) = header_value(trimmed, "Course Instructor:") {
            instructor = Some(value.to_string()).filter(|v| !v.is_empty());
        } else if title.is_none() && !lesson_marker().is_match(trimmed) {
            title = Some(trimmed.to_string());
        } else {
            break;
        }
        lines.next();
    }

    let title = title
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CoursemateError::Ingest("Document has no course title".to_string()))?;

    let mut course = Course::new(title);
    course.link = link;
    course.instructor = instructor;

    let mut sections = vec![Section {
        lesson: None,
        lines: Vec::new(),
    }];

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if let Some(captures) = lesson_marker().captures(trimmed) {
            let number: u32 = captures[1]
                .parse()
                .map_err(|e| CoursemateError::Ingest(format!("Bad lesson number: {}", e)))?;
            let lesson_title = captures[2].trim().to_string();

            let mut lesson_link = None;
            if let Some(&next) = lines.peek() {
                if let Some(value) = header_value(next.trim(), "Lesson Link:") {
                    lesson_link = valid_link(value, &format!("lesson {}", number));
                    lines.next();
                }
            }

            course.lessons.push(Lesson {
                number,
                title: lesson_title,
                link: lesson_link,
            });
            sections.push(Section {
                lesson: Some(number),
                lines: Vec::new(),
            });
            continue;
        }

        if let Some(section) = sections.last_mut() {
            section.lines.push(trimmed.to_string());
        }
    }

    let mut chunks = Vec::new();
    for section in sections {
        for content in chunker.chunk(&section.lines.join("\n")) {
            chunks.push(CourseChunk {
                course_title: course.title.clone(),
                lesson_number: section.lesson,
                chunk_index: chunks.len() as u32,
                content,
            });
        }
    }

    debug!(
        course = %course.title,
        lessons = course.lessons.len(),
        chunks = chunks.len(),
        "Parsed course document"
    );

    Ok((course, chunks))
}

/// Read and parse a course document from disk.
pub fn load_course_file(path: &Path, chunker: &SentenceChunker) -> Result<(Course, Vec<CourseChunk>)> {
    let text = std::fs::read_to_string(path)?;
    parse_course_document(&text, chunker)
        .map_err(|e| CoursemateError::Ingest(format!("{}: {}", path.display(), e)))
}

/// Course document files directly inside `dir`, sorted by name.
pub fn course_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CoursemateError::Ingest(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| COURSE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Summary of a folder ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub courses_added: usize,
    pub chunks_added: usize,
    /// Titles skipped because they were already indexed.
    pub skipped: Vec<String>,
    /// Files that could not be parsed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Load every course document in `dir` into the knowledge base.
///
/// Courses whose title is already stored are skipped unless `clear` is set,
/// in which case the knowledge base is emptied first.
#[instrument(skip(knowledge, chunker))]
pub async fn load_course_folder(
    knowledge: &dyn KnowledgeBase,
    dir: &Path,
    chunker: &SentenceChunker,
    clear: bool,
) -> Result<IngestReport> {
    let files = course_files(dir)?;

    if clear {
        info!("Clearing existing courses");
        knowledge.clear().await?;
    }

    let mut existing = knowledge.course_titles().await?;
    let mut report = IngestReport::default();

    for path in files {
        let (course, chunks) = match load_course_file(&path, chunker) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                report.failed.push((path, e.to_string()));
                continue;
            }
        };

        if existing.contains(&course.title) {
            debug!("Course already indexed: {}", course.title);
            report.skipped.push(course.title);
            continue;
        }

        knowledge.add_course(&course, &chunks).await?;
        info!("Added course: {} ({} chunks)", course.title, chunks.len());

        report.courses_added += 1;
        report.chunks_added += chunks.len();
        existing.push(course.title);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::MemoryKnowledgeBase;
    use std::fs;

    const DOC: &str = "Course Title: Building Towards Computer Use
Course Link: https://example.com/computer-use
Course Instructor: Colt Steele

Lesson 0: Introduction
Lesson Link: https://example.com/computer-use/0
Welcome to the course. We will build an agent.

Lesson 1: Working With The API
Lesson Link: not a url
The API accepts messages. Each message has a role.
";

    #[test]
    fn test_parse_header_and_lessons() {
        let (course, chunks) = parse_course_document(DOC, &SentenceChunker::default()).unwrap();

        assert_eq!(course.title, "Building Towards Computer Use");
        assert_eq!(course.link.as_deref(), Some("https://example.com/computer-use"));
        assert_eq!(course.instructor.as_deref(), Some("Colt Steele"));
        assert_eq!(course.lessons.len(), 2);
        assert_eq!(course.lessons[0].number, 0);
        assert_eq!(course.lessons[0].title, "Introduction");
        assert_eq!(course.lesson_link(0), Some("https://example.com/computer-use/0"));
        assert_eq!(course.lessons[1].link, None);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].lesson_number, Some(0));
        assert_eq!(chunks[0].content, "Welcome to the course. We will build an agent.");
        assert_eq!(chunks[1].lesson_number, Some(1));
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_untitled_document_uses_first_line() {
        let text = "Intro to Rust\n\nOwnership is the key idea. Borrowing follows.";
        let (course, chunks) = parse_course_document(text, &SentenceChunker::default()).unwrap();

        assert_eq!(course.title, "Intro to Rust");
        assert!(course.lessons.is_empty());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].lesson_number, None);
    }

    #[test]
    fn test_empty_document_is_error() {
        assert!(parse_course_document("  \n\n", &SentenceChunker::default()).is_err());
    }

    #[tokio::test]
    async fn test_load_folder_skips_existing_courses() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("course1.txt"), DOC).unwrap();
        fs::write(dir.path().join("notes.pdf"), "ignored").unwrap();
        fs::write(dir.path().join("empty.md"), "\n").unwrap();

        let kb = MemoryKnowledgeBase::default();
        let chunker = SentenceChunker::default();

        let report = load_course_folder(&kb, dir.path(), &chunker, false).await.unwrap();
        assert_eq!(report.courses_added, 1);
        assert_eq!(report.chunks_added, 2);
        assert_eq!(report.failed.len(), 1);

        let report = load_course_folder(&kb, dir.path(), &chunker, false).await.unwrap();
        assert_eq!(report.courses_added, 0);
        assert_eq!(report.skipped, vec!["Building Towards Computer Use".to_string()]);

        let report = load_course_folder(&kb, dir.path(), &chunker, true).await.unwrap();
        assert_eq!(report.courses_added, 1);
        assert_eq!(kb.course_titles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_folder_rejects_missing_dir() {
        let kb = MemoryKnowledgeBase::default();
        let result = load_course_folder(
            &kb,
            Path::new("/definitely/not/here"),
            &SentenceChunker::default(),
            false,
        )
        .await;
        assert!(result.is_err());
    }
}
