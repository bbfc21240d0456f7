//! Builds the query system from settings.

use crate::config::{KnowledgeProvider, Settings};
use crate::error::Result;
use crate::knowledge::{KnowledgeBase, MemoryKnowledgeBase, SqliteKnowledgeBase};
use crate::llm::{create_client_with_timeout, LanguageModel, OpenAiModel};
use crate::rag::RagSystem;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Open the configured knowledge base backend.
pub fn open_knowledge_base(settings: &Settings) -> Result<Arc<dyn KnowledgeBase>> {
    let max_results = settings.knowledge.max_results;
    match settings.knowledge.provider {
        KnowledgeProvider::Sqlite => Ok(Arc::new(SqliteKnowledgeBase::new(
            &settings.sqlite_path(),
            max_results,
        )?)),
        KnowledgeProvider::Memory => {
            info!("Using in-memory knowledge base");
            Ok(Arc::new(MemoryKnowledgeBase::new(max_results)))
        }
    }
}

/// Create the chat model client.
pub fn build_model(settings: &Settings) -> Result<Arc<dyn LanguageModel>> {
    let client = create_client_with_timeout(
        settings.model.api_base.as_deref(),
        Duration::from_secs(settings.model.timeout_seconds),
    )?;
    Ok(Arc::new(OpenAiModel::new(client, &settings.model.model)))
}

/// Build the query system, loading the configured docs folder if any.
pub async fn build_rag_system(settings: &Settings) -> Result<RagSystem> {
    let knowledge = open_knowledge_base(settings)?;
    let model = build_model(settings)?;
    let rag = RagSystem::from_settings(settings, knowledge, model)?;

    if let Some(dir) = &settings.ingest.docs_dir {
        let path = Settings::expand_path(dir);
        match rag.add_course_folder(&path, false).await {
            Ok(report) if report.courses_added > 0 => info!(
                "Loaded {} courses ({} chunks) from {}",
                report.courses_added,
                report.chunks_added,
                path.display()
            ),
            Ok(_) => {}
            Err(e) => warn!("Could not load courses from {}: {}", path.display(), e),
        }
    }

    Ok(rag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_loads_docs_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("course.txt"),
            "Course Title: Prompt Compression\n\nLesson 1: Basics\nShorter prompts cost less.\n",
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.knowledge.provider = KnowledgeProvider::Memory;
        settings.ingest.docs_dir = Some(dir.path().to_string_lossy().to_string());

        let rag = build_rag_system(&settings).await.unwrap();
        let analytics = rag.course_analytics().await.unwrap();
        assert_eq!(analytics.course_titles, vec!["Prompt Compression"]);
    }

    #[test]
    fn test_sqlite_backend_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.knowledge.sqlite_path = dir.path().join("kb.db").to_string_lossy().to_string();

        open_knowledge_base(&settings).unwrap();
        assert!(dir.path().join("kb.db").exists());
    }
}
