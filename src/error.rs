//! Error types for Coursemate.

use thiserror::Error;

/// Library-level error type for Coursemate operations.
#[derive(Error, Debug)]
pub enum CoursemateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Ingestion failed: {0}")]
    Ingest(String),

    #[error("Language model error: {0}")]
    Model(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Coursemate operations.
pub type Result<T> = std::result::Result<T, CoursemateError>;
