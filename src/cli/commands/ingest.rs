//! Ingest command implementation.

use crate::cli::setup::open_knowledge_base;
use crate::cli::{content_preview, Output};
use crate::config::Settings;
use crate::ingest::{course_files, load_course_folder, SentenceChunker};
use anyhow::{bail, Result};

/// Index every course document in a folder.
pub async fn run_ingest(dir: Option<&str>, clear: bool, settings: Settings) -> Result<()> {
    let Some(dir) = dir.or(settings.ingest.docs_dir.as_deref()) else {
        Output::error("No folder given and ingest.docs_dir is not configured.");
        bail!("missing course folder");
    };
    let path = Settings::expand_path(dir);

    let files = course_files(&path)?;
    if files.is_empty() {
        Output::warning(&format!("No .txt or .md files found in {}", path.display()));
        return Ok(());
    }

    let knowledge = open_knowledge_base(&settings)?;
    let chunker = SentenceChunker::new(settings.ingest.chunk_size, settings.ingest.chunk_overlap);

    let spinner = Output::spinner(&format!("Indexing {} course documents...", files.len()));
    let report = load_course_folder(knowledge.as_ref(), &path, &chunker, clear).await;
    spinner.finish_and_clear();

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&format!(
        "Added {} courses ({} chunks)",
        report.courses_added, report.chunks_added
    ));

    if !report.skipped.is_empty() {
        Output::header("Already indexed");
        for title in &report.skipped {
            Output::list_item(title);
        }
    }

    if !report.failed.is_empty() {
        Output::header("Failed");
        for (file, reason) in &report.failed {
            Output::kv(&file.display().to_string(), &content_preview(reason, 120));
        }
    }

    Ok(())
}
