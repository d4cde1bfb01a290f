//! CLI module for Pensum.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Pensum - Ask questions about your course materials
///
/// Indexes course documents and answers questions with a retrieval-backed
/// LLM that can search lesson content and course outlines.
#[derive(Parser, Debug)]
#[command(name = "pensum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question about the indexed courses
    Ask {
        /// The question to ask
        question: String,
    },

    /// Start an interactive chat session
    Chat,

    /// Index course files from a folder
    Ingest {
        /// Folder of course files (defaults to rag.docs_dir)
        path: Option<String>,

        /// Clear the index before ingesting
        #[arg(long)]
        clear: bool,
    },

    /// List indexed courses
    Courses,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
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
