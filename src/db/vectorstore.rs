//! Vector Index Abstraction Layer
//!
//! The RAG pipeline stores chunk vectors through the [`VectorIndex`] trait.
//! One index wraps one collection, bound to the embedding provider that
//! produced its vectors.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  VectorIndex Trait                  │
//! ├─────────────────────────────────────────────────────┤
//! │  upsert  │  search  │  get  │  count  │  stats      │
//! └─────────────────────────────────────────────────────┘
//!                          ▲
//!                          │
//!               ┌──────────┴──────────┐
//!               │ EmbeddedVectorIndex │
//!               │  (disk or memory)   │
//!               └─────────────────────┘
//! ```
//!
//! # Score direction
//!
//! Every score is cosine similarity: higher is closer. Results are ordered
//! best-first with ties broken by id.
//!
//! # Example
//!
//! ```rust,ignore
//! use askmydocs::db::vectorstore::VectorIndexProvider;
//!
//! let index = VectorIndexProvider::Disk { path: "./data/vectors".into() }
//!     .open("documents", "ollama:nomic-embed-text")
//!     .await?;
//!
//! index.upsert(ids, vectors, texts, metadatas).await?;
//! let hits = index.search(&query_vector, 5).await?;
//! ```

use crate::types::Result;
use crate::utils::toml_config::StorageConfig;
use askmydocs_vector::{DistanceMetric, Record, SearchResult, VectorMetadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Provider Configuration
// ============================================================================

/// Where the index keeps its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum VectorIndexProvider {
    /// Snapshot files under `path`, reloaded on open.
    Disk {
        /// Directory holding `collections.json` and one folder per collection.
        path: PathBuf,
    },

    /// Nothing touches disk; contents are lost when the process exits.
    InMemory,
}

impl VectorIndexProvider {
    pub fn from_storage(storage: &StorageConfig) -> Self {
        VectorIndexProvider::Disk {
            path: storage.vector_path.clone(),
        }
    }

    /// Open the index for `collection`, bound to `provider_identity`.
    ///
    /// # Errors
    ///
    /// `IndexIo` if stored data cannot be read, `Configuration` if the
    /// collection was built by a different embedding provider.
    pub async fn open(
        &self,
        collection: &str,
        provider_identity: &str,
    ) -> Result<Arc<dyn VectorIndex>> {
        let index = match self {
            VectorIndexProvider::Disk { path } => {
                super::embedded::EmbeddedVectorIndex::open_persistent(
                    path.clone(),
                    collection,
                    provider_identity,
                )
                .await?
            }
            VectorIndexProvider::InMemory => {
                super::embedded::EmbeddedVectorIndex::open_in_memory(collection, provider_identity)
                    .await?
            }
        };
        Ok(Arc::new(index))
    }
}

// ============================================================================
// Index Statistics
// ============================================================================

/// Statistics about the index behind a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Name of the collection.
    pub collection: String,
    /// Embedding provider identity the collection is bound to.
    pub provider: String,
    /// Vector size, `None` until the first upsert.
    pub dimensions: Option<usize>,
    /// Number of stored chunks.
    pub record_count: usize,
    /// Similarity metric.
    pub metric: DistanceMetric,
    /// Data directory, `None` for in-memory indexes.
    pub path: Option<PathBuf>,
}

// ============================================================================
// Vector Index Trait
// ============================================================================

/// Chunk vector storage with exact similarity search.
///
/// Writes are serialized and atomic per batch. Searches run concurrently
/// with each other and never observe a half-applied batch.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Get the name of this index backend.
    fn provider_name(&self) -> &'static str;

    /// Insert or replace records by id.
    ///
    /// All four sequences must have the same length. Returns the number of
    /// records written.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for mismatched lengths or bad vectors, `IndexIo` when
    /// the batch cannot be persisted. Nothing is applied on error.
    async fn upsert(
        &self,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadatas: Vec<VectorMetadata>,
    ) -> Result<usize>;

    /// At most `k` results, best-first. Empty when nothing is stored.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Get a stored record by id.
    async fn get(&self, id: &str) -> Result<Option<Record>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;

    /// Number of stored records whose `doc_id` metadata equals `doc_id`.
    async fn count_by_doc(&self, doc_id: &str) -> Result<usize>;

    /// Index statistics.
    async fn stats(&self) -> Result<IndexStats>;
}
