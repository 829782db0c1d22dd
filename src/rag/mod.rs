//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! This module answers questions from an indexed document collection.
//!
//! # Module Structure
//!
//! - [`rag::chunker`](crate::rag::chunker) - Overlapping text chunks (recursive or semantic)
//! - [`rag::embeddings`](crate::rag::embeddings) - Ollama / OpenAI embedding providers
//! - [`rag::retriever`](crate::rag::retriever) - Query embedding, search, dedup and previews
//! - [`rag::generator`](crate::rag::generator) - Grounded prompting with backend fallback
//! - [`rag::pipeline`](crate::rag::pipeline) - `ingest` and `answer` entry points
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are chunked and embedded
//! 2. **Storage** - Chunk vectors are upserted as `{doc_id}_{chunk_index}`
//! 3. **Retrieval** - The query is embedded and the top-k chunks retrieved
//! 4. **Generation** - A local or remote LLM answers from the retrieved context
//!
//! # Example
//!
//! ```ignore
//! use askmydocs::rag::RagPipeline;
//! use askmydocs::types::{DocumentMetadata, ModelChoice};
//!
//! let pipeline = RagPipeline::open(&config).await?;
//! pipeline
//!     .ingest("42", &text, DocumentMetadata::new("42", "ml.txt"))
//!     .await?;
//!
//! let result = pipeline.answer("What is supervised learning?", ModelChoice::Local).await?;
//! println!("{} ({})", result.answer, result.model_used);
//! ```

pub mod chunker;
pub mod embeddings;
pub mod generator;
pub mod pipeline;
pub mod retriever;

pub use chunker::{Chunker, ChunkingStrategy, TextChunk};
pub use embeddings::{EmbeddingBackend, EmbeddingProvider};
pub use generator::{AnswerGenerator, GenerationOutcome, GenerationState, RemoteBackend};
pub use pipeline::RagPipeline;
pub use retriever::{ContextPassage, RetrievedContext, Retriever};
