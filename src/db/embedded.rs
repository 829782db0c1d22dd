//! Embedded vector index backed by `askmydocs-vector`.
//!
//! The collection is created lazily on the first upsert, when the vector
//! size is known. Opening an existing collection checks that it was built
//! by the same embedding provider.

use crate::types::{AppError, Result};
use askmydocs_vector::{
    Config, DistanceMetric, Error as VectorError, Record, SearchResult, VectorDb, VectorMetadata,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use super::vectorstore::{IndexStats, VectorIndex};

pub struct EmbeddedVectorIndex {
    db: VectorDb,
    collection: String,
    provider: String,
    path: Option<PathBuf>,
}

impl EmbeddedVectorIndex {
    /// Open (or create) an index persisted under `path`.
    pub async fn open_persistent(
        path: PathBuf,
        collection: &str,
        provider_identity: &str,
    ) -> Result<Self> {
        let db = VectorDb::open(Config::persistent(path.clone())).await?;
        let index = Self::bind(db, Some(path), collection, provider_identity)?;
        info!(
            collection,
            records = index.current_count(),
            path = ?index.path,
            "Opened vector index"
        );
        Ok(index)
    }

    /// Open an index that lives only in memory.
    pub async fn open_in_memory(collection: &str, provider_identity: &str) -> Result<Self> {
        let db = VectorDb::open(Config::memory()).await?;
        Self::bind(db, None, collection, provider_identity)
    }

    fn bind(
        db: VectorDb,
        path: Option<PathBuf>,
        collection: &str,
        provider_identity: &str,
    ) -> Result<Self> {
        if let Ok(existing) = db.get_collection(collection) {
            if existing.provider() != provider_identity {
                return Err(VectorError::ProviderMismatch {
                    collection: collection.to_string(),
                    stored: existing.provider().to_string(),
                    requested: provider_identity.to_string(),
                }
                .into());
            }
        }

        Ok(Self {
            db,
            collection: collection.to_string(),
            provider: provider_identity.to_string(),
            path,
        })
    }

    fn current_count(&self) -> usize {
        self.db.count(&self.collection).unwrap_or(0)
    }
}

#[async_trait]
impl VectorIndex for EmbeddedVectorIndex {
    fn provider_name(&self) -> &'static str {
        if self.path.is_some() {
            "embedded-disk"
        } else {
            "embedded-memory"
        }
    }

    async fn upsert(
        &self,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadatas: Vec<VectorMetadata>,
    ) -> Result<usize> {
        let len = ids.len();
        if vectors.len() != len || texts.len() != len || metadatas.len() != len {
            return Err(AppError::InvalidInput(format!(
                "upsert needs equal lengths, got {} ids, {} vectors, {} texts, {} metadatas",
                len,
                vectors.len(),
                texts.len(),
                metadatas.len()
            )));
        }
        let Some(dimensions) = vectors.first().map(Vec::len) else {
            return Ok(0);
        };

        self.db
            .ensure_collection(
                &self.collection,
                dimensions,
                DistanceMetric::Cosine,
                &self.provider,
            )
            .await?;

        let records: Vec<Record> = ids
            .into_iter()
            .zip(vectors)
            .zip(texts)
            .zip(metadatas)
            .map(|(((id, vector), text), metadata)| Record {
                id,
                vector,
                text,
                metadata,
            })
            .collect();

        let written = self.db.upsert(&self.collection, records).await?;
        debug!(collection = %self.collection, written, "Upserted chunks");
        Ok(written)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 || !self.db.collection_exists(&self.collection) {
            return Ok(Vec::new());
        }
        Ok(self.db.search(&self.collection, query, k).await?)
    }

    async fn get(&self, id: &str) -> Result<Option<Record>> {
        match self.db.get(&self.collection, id) {
            Ok(record) => Ok(record),
            Err(VectorError::CollectionNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.current_count())
    }

    async fn count_by_doc(&self, doc_id: &str) -> Result<usize> {
        match self.db.count_where(&self.collection, "doc_id", doc_id) {
            Ok(count) => Ok(count),
            Err(VectorError::CollectionNotFound(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    async fn stats(&self) -> Result<IndexStats> {
        let (dimensions, record_count) = match self.db.collection_stats(&self.collection) {
            Ok(stats) => (Some(stats.dimensions), stats.record_count),
            Err(VectorError::CollectionNotFound(_)) => (None, 0),
            Err(e) => return Err(e.into()),
        };

        Ok(IndexStats {
            collection: self.collection.clone(),
            provider: self.provider.clone(),
            dimensions,
            record_count,
            metric: DistanceMetric::Cosine,
            path: self.path.clone(),
        })
    }
}
