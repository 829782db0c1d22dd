//! Common types for askmydocs-vector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a record in a collection.
pub type VectorId = String;

/// Flat key-value metadata stored next to each record.
///
/// Keys are kept sorted so persisted snapshots are byte-stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorMetadata {
    /// Key-value pairs of metadata.
    pub data: BTreeMap<String, MetadataValue>,
}

impl VectorMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create metadata from a list of key-value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetadataValue>,
    {
        Self {
            data: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Insert a key-value pair, replacing any previous value.
    pub fn insert<K: Into<String>, V: Into<MetadataValue>>(&mut self, key: K, value: V) {
        self.data.insert(key.into(), value.into());
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.data.get(key)
    }

    /// Get a string value by key.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.data.get(key)? {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get an integer value by key.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.data.get(key)? {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.data.iter()
    }

    /// Check if metadata is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of metadata entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// A scalar metadata value.
///
/// Serialized untagged so snapshots read as plain JSON objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// String value.
    String(String),
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
}

impl MetadataValue {
    /// Render the value as display text.
    pub fn to_text(&self) -> String {
        match self {
            MetadataValue::String(s) => s.clone(),
            MetadataValue::Bool(b) => b.to_string(),
            MetadataValue::Int(i) => i.to_string(),
            MetadataValue::Float(f) => f.to_string(),
        }
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

impl From<usize> for MetadataValue {
    fn from(i: usize) -> Self {
        MetadataValue::Int(i as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// One stored chunk: its vector, its original text and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Caller-supplied id, unique within a collection.
    pub id: VectorId,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Chunk text, returned verbatim by searches.
    pub text: String,
    /// Metadata associated with the record.
    #[serde(default)]
    pub metadata: VectorMetadata,
}

/// Result of a vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// ID of the matched record.
    pub id: VectorId,
    /// Similarity score, higher is closer.
    pub score: f32,
    /// Stored chunk text.
    pub text: String,
    /// Stored metadata.
    pub metadata: VectorMetadata,
}

impl SearchResult {
    pub(crate) fn from_record(record: &Record, score: f32) -> Self {
        Self {
            id: record.id.clone(),
            score,
            text: record.text.clone(),
            metadata: record.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_accessors() {
        let mut meta = VectorMetadata::new();
        meta.insert("filename", "notes.md");
        meta.insert("chunk_index", 3usize);
        meta.insert("draft", false);

        assert_eq!(meta.get_string("filename"), Some("notes.md"));
        assert_eq!(meta.get_int("chunk_index"), Some(3));
        assert_eq!(meta.get_string("chunk_index"), None);
        assert_eq!(meta.get("draft"), Some(&MetadataValue::Bool(false)));
        assert_eq!(meta.len(), 3);
    }

    #[test]
    fn test_metadata_serializes_as_plain_object() {
        let meta = VectorMetadata::from_pairs([
            ("b", MetadataValue::Int(2)),
            ("a", MetadataValue::String("x".into())),
            ("c", MetadataValue::Float(0.5)),
        ]);
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"a":"x","b":2,"c":0.5}"#);

        let back: VectorMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(MetadataValue::Int(7).to_text(), "7");
        assert_eq!(MetadataValue::from("doc").to_text(), "doc");
    }
}
