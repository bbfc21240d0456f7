//! Tool calling over the course knowledge base.
//!
//! The model can search lesson content and look up course outlines. Tools are
//! held by a `ToolRegistry`, and `Generator` runs the bounded loop that feeds
//! tool output back to the model.

mod outline;
mod registry;
mod runner;
mod search;
mod tool;

pub use outline::{format_outline, CourseOutlineTool, OUTLINE_TOOL_NAME};
pub use registry::ToolRegistry;
pub use runner::{Generator, DEFAULT_MAX_TOKENS, MAX_TOOL_ROUNDS};
pub use search::{CourseSearchTool, SEARCH_TOOL_NAME};
pub use tool::{Citation, CitationSource, Tool, ToolDispatcher};
