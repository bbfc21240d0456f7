//! Question answering over course materials with sources.
//!
//! `RagSystem` is the entry point used by the CLI and HTTP server: it owns the
//! knowledge base handle, the tool-calling generator and conversation sessions.

mod system;

pub use system::{CourseAnalytics, QueryResponse, RagSystem};
