//! Exact flat index.
//!
//! Records live in a plain map keyed by id and every search scores every
//! record. For the corpus sizes a single user's documents produce this is
//! fast enough, and it keeps ranking fully deterministic: scores are exact
//! and ties are broken by id.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{Record, SearchResult};
use std::cmp::Ordering;
use std::collections::HashMap;

/// In-memory record table with brute-force similarity search.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    metric: DistanceMetric,
    records: HashMap<String, Record>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimensions` components.
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::InvalidVector("Dimensions must be > 0".to_string()));
        }
        Ok(Self {
            dimensions,
            metric,
            records: HashMap::new(),
        })
    }

    /// Vector dimensionality accepted by this index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check that a vector can be stored or used as a query.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(
                "Vector contains NaN or infinite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Insert or replace records. Callers validate first; this never fails.
    pub fn apply(&mut self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.records.insert(record.id.clone(), record);
        }
    }

    /// Fetch one record by id.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    /// Whether a record with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Iterate over all records in unspecified order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Return at most `limit` records, best-first.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.validate_vector(query)?;
        if limit == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &Record)> = self
            .records
            .values()
            .map(|r| (self.metric.similarity(query, &r.vector), r))
            .collect();

        scored.sort_by(|(sa, ra), (sb, rb)| rank_order(*sa, &ra.id, *sb, &rb.id));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(score, record)| SearchResult::from_record(record, score))
            .collect())
    }
}

/// Score descending, then id ascending.
fn rank_order(score_a: f32, id_a: &str, score_b: f32, id_b: &str) -> Ordering {
    score_b
        .total_cmp(&score_a)
        .then_with(|| id_a.cmp(id_b))
}
