//! # askmydocs-vector
//!
//! An embedded vector store for document chunks. It keeps each chunk's
//! embedding next to its text and metadata, answers exact cosine
//! nearest-neighbour queries, and writes every accepted batch through to
//! disk before acknowledging it.
//!
//! ## Features
//!
//! - **Exact search**: flat scan, scores are true cosine similarities, ties broken by id
//! - **Single writer, many readers**: searches never wait on disk I/O
//! - **All-or-nothing batches**: a batch is validated in full before any record lands
//! - **Atomic snapshots**: temp file, fsync, rename
//! - **Provider guard**: each collection remembers which embedding model filled it
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use askmydocs_vector::{Config, DistanceMetric, Record, VectorDb, VectorMetadata};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), askmydocs_vector::Error> {
//!     let db = VectorDb::open(Config::persistent("./data/vectors")).await?;
//!     db.ensure_collection("documents", 768, DistanceMetric::Cosine, "ollama:nomic-embed-text")
//!         .await?;
//!
//!     db.upsert("documents", vec![Record {
//!         id: "doc1_0".into(),
//!         vector: vec![0.1; 768],
//!         text: "Supervised learning uses labelled data.".into(),
//!         metadata: VectorMetadata::from_pairs([("doc_id", "doc1")]),
//!     }]).await?;
//!
//!     let hits = db.search("documents", &vec![0.1; 768], 5).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod config;
pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

// Re-exports for convenience
pub use collection::Collection;
pub use config::Config;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use types::{MetadataValue, Record, SearchResult, VectorId, VectorMetadata};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The main vector database instance.
///
/// Cloning is cheap; clones share the same collections. Uses `scc::HashMap`
/// for the collection table so lookups are safe across `.await` points.
#[derive(Clone)]
pub struct VectorDb {
    inner: Arc<VectorDbInner>,
}

struct VectorDbInner {
    config: Config,
    collections: scc::HashMap<String, Arc<Collection>>,
    /// Serializes collection creation and deletion.
    create_gate: tokio::sync::Mutex<()>,
    /// Serializes rewrites of collections.json.
    manifest_gate: tokio::sync::Mutex<()>,
}

impl VectorDb {
    /// Open or create a vector database.
    ///
    /// For a persistent configuration the data directory is created if
    /// missing and every collection listed in its manifest is loaded. A
    /// collection that fails to load fails the open.
    #[instrument(skip(config), fields(persistent = config.is_persistent()))]
    pub async fn open(config: Config) -> Result<Self> {
        let db = Self {
            inner: Arc::new(VectorDbInner {
                config: config.clone(),
                collections: scc::HashMap::new(),
                create_gate: tokio::sync::Mutex::new(()),
                manifest_gate: tokio::sync::Mutex::new(()),
            }),
        };

        if let Some(ref path) = config.data_path {
            db.load_collections(path).await?;
        }

        info!(collections = db.inner.collections.len(), "Opened vector database");
        Ok(db)
    }

    /// Create a new, empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionExists`] if the name is taken.
    #[instrument(skip(self))]
    pub async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        provider: &str,
    ) -> Result<Arc<Collection>> {
        // held until the table entry exists, so a losing creator never
        // rewrites the winner's metadata
        let _gate = self.inner.create_gate.lock().await;
        if self.inner.collections.contains(name) {
            return Err(Error::CollectionExists(name.to_string()));
        }

        let collection = Arc::new(Collection::new(
            name.to_string(),
            dimensions,
            metric,
            provider.to_string(),
        )?);

        if let Some(ref path) = self.inner.config.data_path {
            persistence::save_metadata(path, &collection).await?;
        }

        if self
            .inner
            .collections
            .insert(name.to_string(), collection.clone())
            .is_err()
        {
            return Err(Error::CollectionExists(name.to_string()));
        }

        if let Some(ref path) = self.inner.config.data_path {
            self.persist_manifest(path).await?;
        }

        info!(name, dimensions, %metric, provider, "Created collection");
        Ok(collection)
    }

    /// Return the named collection, creating it if needed.
    ///
    /// An existing collection must match both `dimensions` and `provider`;
    /// vectors from different embedding models are not comparable.
    pub async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        provider: &str,
    ) -> Result<Arc<Collection>> {
        let collection = match self.get_collection(name) {
            Ok(existing) => existing,
            Err(_) => match self.create_collection(name, dimensions, metric, provider).await {
                Ok(created) => return Ok(created),
                Err(Error::CollectionExists(_)) => self.get_collection(name)?,
                Err(e) => return Err(e),
            },
        };

        check_identity(&collection, dimensions, provider)?;
        Ok(collection)
    }

    /// Delete a collection and its files.
    #[instrument(skip(self))]
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        let _gate = self.inner.create_gate.lock().await;
        if self.inner.collections.remove(name).is_none() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }

        if let Some(ref path) = self.inner.config.data_path {
            persistence::delete_collection(path, name).await?;
            self.persist_manifest(path).await?;
        }

        info!(name, "Deleted collection");
        Ok(())
    }

    /// Check if a collection exists.
    pub fn collection_exists(&self, name: &str) -> bool {
        self.inner.collections.contains(name)
    }

    /// List all collection names, sorted.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.inner.collections.scan(|k, _| {
            names.push(k.clone());
        });
        names.sort();
        names
    }

    /// Get a handle to a collection.
    pub fn get_collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.inner
            .collections
            .read(name, |_, v| v.clone())
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Insert or replace a batch of records.
    ///
    /// The batch is validated as a whole first; if any record is rejected
    /// nothing is written. For persistent databases the resulting snapshot
    /// is on disk before the records become searchable.
    ///
    /// # Returns
    ///
    /// The number of records written.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn upsert(&self, collection: &str, records: Vec<Record>) -> Result<usize> {
        let col = self.get_collection(collection)?;
        if records.is_empty() {
            return Ok(0);
        }

        let _gate = col.write_gate().lock().await;
        let staged = col.stage(records, self.inner.config.max_records)?;
        let count = staged.len();

        if let Some(ref path) = self.inner.config.data_path {
            let snapshot = col.snapshot_with(&staged);
            persistence::save_records(path, collection, &snapshot).await?;
        }

        col.apply(staged);
        debug!(count, total = col.len(), "Upserted batch");
        Ok(count)
    }

    /// Exact nearest-neighbour search, best-first, at most `limit` results.
    #[instrument(skip(self, query), fields(limit, dim = query.len()))]
    pub async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let col = self.get_collection(collection)?;
        let results = col.search(query, limit)?;
        debug!(count = results.len(), "Search completed");
        Ok(results)
    }

    /// Get a record by id.
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        Ok(self.get_collection(collection)?.get(id))
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.get_collection(collection)?.len())
    }

    /// Number of records whose metadata `key` equals `value`.
    pub fn count_where(
        &self,
        collection: &str,
        key: &str,
        value: impl Into<MetadataValue>,
    ) -> Result<usize> {
        Ok(self.get_collection(collection)?.count_where(key, &value.into()))
    }

    /// Collection statistics.
    pub fn collection_stats(&self, collection: &str) -> Result<CollectionStats> {
        Ok(self.get_collection(collection)?.stats())
    }

    async fn load_collections(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await?;

        for name in persistence::load_manifest(path).await? {
            let collection = persistence::load_collection(path, &name).await?;
            let _ = self.inner.collections.insert(name, Arc::new(collection));
        }
        Ok(())
    }

    async fn persist_manifest(&self, path: &Path) -> Result<()> {
        let _gate = self.inner.manifest_gate.lock().await;
        persistence::save_manifest(path, self.list_collections()).await
    }
}

fn check_identity(collection: &Collection, dimensions: usize, provider: &str) -> Result<()> {
    if collection.provider() != provider {
        return Err(Error::ProviderMismatch {
            collection: collection.name().to_string(),
            stored: collection.provider().to_string(),
            requested: provider.to_string(),
        });
    }
    if collection.dimensions() != dimensions {
        return Err(Error::DimensionMismatch {
            expected: collection.dimensions(),
            actual: dimensions,
        });
    }
    Ok(())
}

/// Statistics about a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Name of the collection.
    pub name: String,
    /// Dimensionality of vectors.
    pub dimensions: usize,
    /// Similarity metric.
    pub metric: DistanceMetric,
    /// Embedding provider identity.
    pub provider: String,
    /// Number of records.
    pub record_count: usize,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, doc: &str, vector: Vec<f32>) -> Record {
        Record {
            id: id.to_string(),
            vector,
            text: format!("chunk {}", id),
            metadata: VectorMetadata::from_pairs([("doc_id", doc)]),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let db = VectorDb::open(Config::memory()).await.unwrap();
        db.create_collection("test", 3, DistanceMetric::Cosine, "p:m")
            .await
            .unwrap();

        db.upsert(
            "test",
            vec![
                record("vec1", "a", vec![1.0, 0.0, 0.0]),
                record("vec2", "a", vec![0.0, 1.0, 0.0]),
                record("vec3", "b", vec![0.9, 0.1, 0.0]),
            ],
        )
        .await
        .unwrap();

        let results = db.search("test", &[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "vec1");
        assert_eq!(results[1].id, "vec3");
        assert_eq!(db.count_where("test", "doc_id", "a").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_collection_error() {
        let db = VectorDb::open(Config::memory()).await.unwrap();
        db.create_collection("test", 4, DistanceMetric::Cosine, "p:m")
            .await
            .unwrap();

        let result = db
            .create_collection("test", 4, DistanceMetric::Cosine, "p:m")
            .await;
        assert!(matches!(result, Err(Error::CollectionExists(_))));
    }

    #[tokio::test]
    async fn test_ensure_collection_guards_identity() {
        let db = VectorDb::open(Config::memory()).await.unwrap();
        db.ensure_collection("docs", 4, DistanceMetric::Cosine, "ollama:a")
            .await
            .unwrap();

        assert!(db
            .ensure_collection("docs", 4, DistanceMetric::Cosine, "ollama:a")
            .await
            .is_ok());
        assert!(matches!(
            db.ensure_collection("docs", 4, DistanceMetric::Cosine, "openai:b")
                .await,
            Err(Error::ProviderMismatch { .. })
        ));
        assert!(matches!(
            db.ensure_collection("docs", 8, DistanceMetric::Cosine, "ollama:a")
                .await,
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_collection_untouched() {
        let db = VectorDb::open(Config::memory()).await.unwrap();
        db.create_collection("docs", 2, DistanceMetric::Cosine, "p:m")
            .await
            .unwrap();

        let err = db
            .upsert(
                "docs",
                vec![record("a_0", "a", vec![1.0, 0.0]), record("a_1", "a", vec![1.0])],
            )
            .await;
        assert!(err.is_err());
        assert_eq!(db.count("docs").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reopen_yields_identical_results() {
        let dir = TempDir::new().unwrap();
        let query = [0.7, 0.3];

        let before = {
            let db = VectorDb::open(Config::persistent(dir.path())).await.unwrap();
            db.ensure_collection("docs", 2, DistanceMetric::Cosine, "p:m")
                .await
                .unwrap();
            db.upsert(
                "docs",
                vec![
                    record("a_0", "a", vec![1.0, 0.0]),
                    record("a_1", "a", vec![0.5, 0.5]),
                    record("b_0", "b", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
            db.upsert("docs", vec![record("a_1", "a", vec![0.6, 0.4])])
                .await
                .unwrap();
            db.search("docs", &query, 3).await.unwrap()
        };

        let db = VectorDb::open(Config::persistent(dir.path())).await.unwrap();
        assert_eq!(db.list_collections(), vec!["docs".to_string()]);
        let after = db.search("docs", &query, 3).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(db.collection_stats("docs").unwrap().provider, "p:m");
    }

    #[tokio::test]
    async fn test_delete_collection_removes_files() {
        let dir = TempDir::new().unwrap();
        let db = VectorDb::open(Config::persistent(dir.path())).await.unwrap();
        db.create_collection("docs", 2, DistanceMetric::Cosine, "p:m")
            .await
            .unwrap();
        assert!(dir.path().join("docs").exists());

        db.delete_collection("docs").await.unwrap();
        assert!(!db.collection_exists("docs"));
        assert!(!dir.path().join("docs").exists());

        let reopened = VectorDb::open(Config::persistent(dir.path())).await.unwrap();
        assert!(reopened.list_collections().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_are_serialized() {
        let dir = TempDir::new().unwrap();
        let db = VectorDb::open(Config::persistent(dir.path())).await.unwrap();
        db.create_collection("docs", 2, DistanceMetric::Cosine, "p:m")
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.upsert("docs", vec![record(&format!("d{}_0", i), "d", vec![1.0, i as f32])])
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.count("docs").unwrap(), 8);
        let reopened = VectorDb::open(Config::persistent(dir.path())).await.unwrap();
        assert_eq!(reopened.count("docs").unwrap(), 8);
    }

    #[tokio::test]
    async fn test_concurrent_create_keeps_first_metadata() {
        let dir = TempDir::new().unwrap();
        let db = VectorDb::open(Config::persistent(dir.path())).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.create_collection("docs", 2, DistanceMetric::Cosine, &format!("p:{}", i))
                    .await
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(collection) => winners.push(collection),
                Err(e) => assert!(matches!(e, Error::CollectionExists(ref n) if n == "docs")),
            }
        }
        assert_eq!(winners.len(), 1);
        let winner = &winners[0];

        let reopened = VectorDb::open(Config::persistent(dir.path())).await.unwrap();
        let stats = reopened.collection_stats("docs").unwrap();
        assert_eq!(stats.provider, winner.provider());
        assert_eq!(stats.created_at, winner.created_at());
    }
}
