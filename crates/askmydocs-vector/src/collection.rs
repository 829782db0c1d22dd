//! Vector collection.
//!
//! A collection is a named set of records sharing one dimensionality, one
//! metric and one embedding-provider identity. Reads go through a
//! `parking_lot` read lock and never wait on disk. Writers additionally
//! hold an async write gate for the whole stage, persist, apply sequence,
//! so at most one batch per collection is in flight.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::index::FlatIndex;
use crate::types::{MetadataValue, Record, SearchResult};
use crate::CollectionStats;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;

/// A named collection of records.
pub struct Collection {
    name: String,
    dimensions: usize,
    metric: DistanceMetric,
    provider: String,
    created_at: DateTime<Utc>,
    index: RwLock<FlatIndex>,
    write_gate: tokio::sync::Mutex<()>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new(
        name: String,
        dimensions: usize,
        metric: DistanceMetric,
        provider: String,
    ) -> Result<Self> {
        Self::restore(name, dimensions, metric, provider, Utc::now(), Vec::new())
    }

    /// Rebuild a collection from persisted parts.
    pub(crate) fn restore(
        name: String,
        dimensions: usize,
        metric: DistanceMetric,
        provider: String,
        created_at: DateTime<Utc>,
        records: Vec<Record>,
    ) -> Result<Self> {
        let mut index = FlatIndex::new(dimensions, metric)?;
        for record in &records {
            index.validate_vector(&record.vector).map_err(|e| {
                Error::Persistence(format!("Record '{}' in '{}': {}", record.id, name, e))
            })?;
        }
        index.apply(records);

        Ok(Self {
            name,
            dimensions,
            metric,
            provider,
            created_at,
            index: RwLock::new(index),
            write_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Get the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the similarity metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Identity of the embedding provider that produced the stored vectors.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Exact search, best-first.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.index.read().search(query, limit)
    }

    /// Fetch a record by id.
    pub fn get(&self, id: &str) -> Option<Record> {
        self.index.read().get(id).cloned()
    }

    /// Count records whose metadata `key` equals `value`.
    pub fn count_where(&self, key: &str, value: &MetadataValue) -> usize {
        self.index
            .read()
            .records()
            .filter(|r| r.metadata.get(key) == Some(value))
            .count()
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            name: self.name.clone(),
            dimensions: self.dimensions,
            metric: self.metric,
            provider: self.provider.clone(),
            record_count: self.len(),
            created_at: self.created_at,
        }
    }

    /// Async gate serializing writers of this collection.
    pub(crate) fn write_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.write_gate
    }

    /// Validate a whole batch without touching the index.
    ///
    /// `max_records` of 0 means unlimited.
    pub(crate) fn stage(&self, batch: Vec<Record>, max_records: usize) -> Result<Vec<Record>> {
        let index = self.index.read();
        let mut seen = HashSet::with_capacity(batch.len());
        let mut fresh = 0usize;

        for record in &batch {
            if record.id.is_empty() {
                return Err(Error::InvalidBatch("Record id must not be empty".to_string()));
            }
            if !seen.insert(record.id.as_str()) {
                return Err(Error::InvalidBatch(format!(
                    "Duplicate id '{}' in batch",
                    record.id
                )));
            }
            index.validate_vector(&record.vector)?;
            if !index.contains(&record.id) {
                fresh += 1;
            }
        }

        if max_records > 0 && index.len() + fresh > max_records {
            return Err(Error::InvalidBatch(format!(
                "Collection '{}' would exceed {} records",
                self.name, max_records
            )));
        }

        drop(index);
        Ok(batch)
    }

    /// Full record list as it will look once `staged` is applied, sorted by id.
    pub(crate) fn snapshot_with(&self, staged: &[Record]) -> Vec<Record> {
        let index = self.index.read();
        let replaced: HashSet<&str> = staged.iter().map(|r| r.id.as_str()).collect();

        let mut snapshot: Vec<Record> = index
            .records()
            .filter(|r| !replaced.contains(r.id.as_str()))
            .cloned()
            .chain(staged.iter().cloned())
            .collect();
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot
    }

    /// Apply an already staged batch.
    pub(crate) fn apply(&self, staged: Vec<Record>) {
        self.index.write().apply(staged);
    }
}
