//! CLI module for Coursemate.

pub mod commands;
mod output;
pub mod preflight;
pub mod setup;

pub use output::{content_preview, Output};

use clap::{Parser, Subcommand};

/// Coursemate - ask questions about your course materials
///
/// Indexes course documents and answers questions with a tool-calling
/// language model that searches lesson content and course outlines.
#[derive(Parser, Debug)]
#[command(name = "coursemate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "COURSEMATE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index course documents (.txt/.md) from a folder
    Ingest {
        /// Folder with course documents (defaults to ingest.docs_dir)
        dir: Option<String>,

        /// Remove all indexed courses first
        #[arg(long)]
        clear: bool,
    },

    /// Ask a single question about the course materials
    Ask {
        /// The question to ask
        question: String,
    },

    /// Start an interactive chat session
    Chat,

    /// List indexed courses
    Courses,

    /// Show a course outline
    Outline {
        /// Course name (partial matches work)
        course: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
