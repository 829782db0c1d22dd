//! CLI module for AskMyDocs
//!
//! Provides command-line interface parsing for the `askmydocs` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use crate::types::ModelChoice;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AskMyDocs - ask questions about your own documents
///
/// Documents are chunked, embedded and stored in a local vector index.
/// Questions are answered by a local Ollama model or an OpenAI-compatible
/// API, grounded only in the retrieved passages.
#[derive(Parser, Debug)]
#[command(
    name = "askmydocs",
    version,
    about = "AskMyDocs - ask questions about your own documents",
    after_help = "EXAMPLES:\n    \
                  askmydocs init                          # Write askmydocs.toml and data dirs\n    \
                  askmydocs ingest notes/ml.txt           # Index a document\n    \
                  askmydocs ask \"What is supervised learning?\"\n    \
                  askmydocs ask --model remote \"...\"      # Answer with the OpenAI backend\n    \
                  askmydocs stats                         # Show index statistics"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "askmydocs.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default askmydocs.toml, .env.example and data directories
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Embedding backend to configure (local or remote)
        #[arg(long, default_value = "local")]
        backend: String,
    },

    /// Store a document and index its text
    Ingest {
        /// File to ingest (.txt, .md and .pdf are indexed, other types are stored only)
        path: PathBuf,

        /// Document id; chunks are stored as {doc_id}_{n}. Defaults to a new UUID.
        #[arg(long)]
        doc_id: Option<String>,

        /// Name recorded for the document (defaults to the file name)
        #[arg(long)]
        filename: Option<String>,
    },

    /// Ask a question about the indexed documents
    Ask {
        /// The question
        question: String,

        /// Backend to answer with: local (Ollama) or remote (OpenAI)
        #[arg(short, long)]
        model: Option<ModelChoice>,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show vector index statistics
    Stats,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
