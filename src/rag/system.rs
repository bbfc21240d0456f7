//! Query handling over the course knowledge base.

use crate::agent::{
    Citation, CourseOutlineTool, CourseSearchTool, Generator, Tool, ToolRegistry,
};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::ingest::{load_course_file, load_course_folder, IngestReport, SentenceChunker};
use crate::knowledge::{Course, KnowledgeBase};
use crate::llm::LanguageModel;
use crate::session::SessionManager;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Answer to one user question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    /// Sources behind the answer, rendered as plain or linked labels.
    pub sources: Vec<Citation>,
}

/// Catalog summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Ties the knowledge base, tools, model loop and sessions together.
pub struct RagSystem {
    knowledge: Arc<dyn KnowledgeBase>,
    generator: Generator,
    prompts: Prompts,
    sessions: SessionManager,
    chunker: SentenceChunker,
}

impl RagSystem {
    /// Create a system with default prompts, chunking and session limits.
    pub fn new(knowledge: Arc<dyn KnowledgeBase>, model: Arc<dyn LanguageModel>) -> Self {
        Self::with_prompts(knowledge, model, Prompts::default())
    }

    /// Create a system with the given prompts.
    pub fn with_prompts(
        knowledge: Arc<dyn KnowledgeBase>,
        model: Arc<dyn LanguageModel>,
        prompts: Prompts,
    ) -> Self {
        let generator = Generator::new(model, prompts.generator.system.clone());
        Self {
            knowledge,
            generator,
            prompts,
            sessions: SessionManager::default(),
            chunker: SentenceChunker::default(),
        }
    }

    /// Build a system configured from settings.
    pub fn from_settings(
        settings: &Settings,
        knowledge: Arc<dyn KnowledgeBase>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let generator = Generator::new(model, prompts.generator.system.clone())
            .with_max_tokens(settings.model.max_tokens);

        let mut sessions = SessionManager::new(settings.session.max_history);
        if settings.session.idle_timeout_minutes > 0 {
            let minutes = settings.session.idle_timeout_minutes.min(u64::from(u32::MAX));
            sessions = sessions.with_idle_timeout(chrono::Duration::minutes(minutes as i64));
        }

        Ok(Self {
            knowledge,
            generator,
            prompts,
            sessions,
            chunker: SentenceChunker::new(settings.ingest.chunk_size, settings.ingest.chunk_overlap),
        })
    }

    pub fn knowledge(&self) -> &Arc<dyn KnowledgeBase> {
        &self.knowledge
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// A fresh registry with the search and outline tools.
    ///
    /// Each query gets its own registry, so concurrent queries never share
    /// citation state.
    pub fn tool_registry(&self) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(self.knowledge.clone())))?;
        registry.register(Arc::new(CourseOutlineTool::new(self.knowledge.clone())))?;
        Ok(registry)
    }

    /// Answer a question, optionally within a conversation session.
    #[instrument(skip(self, query), fields(session = session_id.unwrap_or("-")))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<QueryResponse> {
        info!("Processing query: {}", query);

        let registry = self.tool_registry()?;
        let definitions = registry.definitions();
        let history = session_id.and_then(|id| self.sessions.conversation_history(id));
        let prompt = self.prompts.render_query(query);

        let answer = self
            .generator
            .generate(&prompt, history.as_deref(), Some(&definitions), Some(&registry))
            .await?;

        let sources = registry.last_citations();
        registry.clear_citations();

        if let Some(id) = session_id {
            self.sessions.add_exchange(id, query, &answer);
        }

        info!(sources = sources.len(), "Query answered");
        Ok(QueryResponse { answer, sources })
    }

    /// Course count and titles.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.knowledge.course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Outline for a (partially named) course, as the outline tool renders it.
    pub async fn course_outline(&self, course_name: &str) -> Result<String> {
        CourseOutlineTool::new(self.knowledge.clone())
            .execute(&serde_json::json!({ "course_name": course_name }))
            .await
    }

    /// Parse one course file and add it, replacing any course with the same title.
    #[instrument(skip(self))]
    pub async fn add_course_document(&self, path: &Path) -> Result<(Course, usize)> {
        let (course, chunks) = load_course_file(path, &self.chunker)?;
        self.knowledge.add_course(&course, &chunks).await?;
        info!("Added course: {} ({} chunks)", course.title, chunks.len());
        Ok((course, chunks.len()))
    }

    /// Add every course document in a folder.
    pub async fn add_course_folder(&self, dir: &Path, clear: bool) -> Result<IngestReport> {
        load_course_folder(self.knowledge.as_ref(), dir, &self.chunker, clear).await
    }
}
