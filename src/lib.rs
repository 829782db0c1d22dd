//! # AskMyDocs
//!
//! Retrieval-augmented question answering over your own documents.
//!
//! ## Overview
//!
//! Documents are split into overlapping chunks, embedded by a local
//! (Ollama) or remote (OpenAI-compatible) provider and stored in an
//! embedded, persistent vector index. Questions are embedded the same way;
//! the closest chunks become the only context a language model may answer
//! from.
//!
//! AskMyDocs can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `askmydocs` binary
//! 2. **As a library** - Build a [`RagPipeline`] and call `ingest` / `answer`
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use askmydocs::{AskConfig, DocumentMetadata, ModelChoice, RagPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AskConfig::load_or_default("askmydocs.toml")?;
//!     let pipeline = RagPipeline::open(&config).await?;
//!
//!     pipeline
//!         .ingest("42", "Supervised learning uses labelled data...", DocumentMetadata::new("42", "ml.txt"))
//!         .await?;
//!
//!     let result = pipeline.answer("What is supervised learning?", ModelChoice::Local).await?;
//!     println!("{} [{}]", result.answer, result.model_used);
//!     Ok(())
//! }
//! ```
//!
//! ## Degraded answers
//!
//! `answer` only fails on an empty question. Backend trouble is reported
//! through [`AnswerResult::model_used`]:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `ollama-{model}` / `openai-{model}` | A model answered |
//! | `no-context` | Nothing relevant is indexed; canned answer |
//! | `fallback` | Every local model failed; excerpt of the best source |
//! | `error` | The remote backend is unconfigured or failed |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local embeddings and generation (default) |
//! | `openai` | OpenAI-compatible embeddings and chat completions (default) |
//!
//! ## Modules
//!
//! - [`rag`] - Chunking, embeddings, retrieval, generation and the pipeline
//! - [`db`] - Vector index abstraction
//! - [`llm`] - LLM client implementations
//! - [`storage`] - Raw document storage and text extraction
//! - [`cli`] - Command-line parsing and output
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface parsing and output.
pub mod cli;
/// Vector index abstraction and the embedded implementation.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Raw document storage and text extraction.
pub mod storage;
/// Core types (answers, sources, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use db::{IndexStats, VectorIndex, VectorIndexProvider};
pub use llm::{LLMClient, Provider};
pub use rag::{AnswerGenerator, Chunker, EmbeddingProvider, RagPipeline, Retriever};
pub use types::{
    AnswerResult, AppError, DocumentMetadata, IngestReport, ModelChoice, Result, SourceDoc,
};
pub use utils::toml_config::AskConfig;
