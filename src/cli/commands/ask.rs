//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::setup::build_rag_system;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let rag = build_rag_system(&settings).await?;

    let spinner = Output::spinner("Searching course materials...");

    match rag.query(question, None).await {
        Ok(response) => {
            spinner.finish_and_clear();
            Output::answer(&response.answer, &response.sources);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
