//! Pre-flight checks before commands that need the model endpoint.

use crate::config::Settings;
use crate::error::{CoursemateError, Result};

/// What a command is about to do.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions requires a reachable, authorized model.
    Query,
    /// Ingestion and catalog listing only touch the knowledge base.
    Catalog,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Query => {
            // Self-hosted OpenAI-compatible endpoints often run without a key.
            if settings.model.api_base.is_none() {
                check_api_key(std::env::var("OPENAI_API_KEY").ok().as_deref())?;
            }
        }
        Operation::Catalog => {}
    }
    Ok(())
}

fn check_api_key(key: Option<&str>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(CoursemateError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(CoursemateError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
