//! Coursemate - a tool-calling course assistant
//!
//! Answers questions about course materials. A language model is given two
//! tools, one that searches lesson text and one that returns a course
//! outline, and may call them for a bounded number of rounds before it must
//! answer.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Conversation types and the `LanguageModel` seam (OpenAI, scripted)
//! - `knowledge` - Course catalog and chunk retrieval (SQLite, in-memory)
//! - `ingest` - Course document parsing and chunking
//! - `agent` - Tools, the tool registry and the bounded generation loop
//! - `session` - Short conversation histories
//! - `rag` - Query entry point tying the above together
//! - `cli` - Command line and HTTP surface
//!
//! # Example
//!
//! ```rust,no_run
//! use coursemate::config::Settings;
//! use coursemate::cli::setup::build_rag_system;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let rag = build_rag_system(&settings).await?;
//!
//!     let response = rag.query("What is covered in lesson 1 of the MCP course?", None).await?;
//!     println!("{}", response.answer);
//!     for source in &response.sources {
//!         println!("  {}", source);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod knowledge;
pub mod llm;
pub mod rag;
pub mod session;

pub use error::{CoursemateError, Result};
