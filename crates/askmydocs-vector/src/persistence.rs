//! Persistence layer for askmydocs-vector.
//!
//! On-disk layout under the configured data path:
//!
//! ```text
//! {data_path}/collections.json          names of all collections
//! {data_path}/{name}/metadata.json      dimensions, metric, provider, created_at
//! {data_path}/{name}/records.json       every record, sorted by id
//! ```
//!
//! Every file is replaced atomically: the new content goes to a uniquely
//! named temporary file in the same directory, is flushed to disk and then
//! renamed over the old file. Readers therefore see either the previous or
//! the new snapshot, never a partial one.

use crate::collection::Collection;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const MANIFEST_FILE: &str = "collections.json";
const METADATA_FILE: &str = "metadata.json";
const RECORDS_FILE: &str = "records.json";

/// Collection metadata stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CollectionMetadata {
    name: String,
    dimensions: usize,
    metric: DistanceMetric,
    provider: String,
    created_at: DateTime<Utc>,
}

impl CollectionMetadata {
    fn of(collection: &Collection) -> Self {
        Self {
            name: collection.name().to_string(),
            dimensions: collection.dimensions(),
            metric: collection.metric(),
            provider: collection.provider().to_string(),
            created_at: collection.created_at(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    collections: Vec<String>,
}

fn collection_dir(base: &Path, name: &str) -> PathBuf {
    base.join(name)
}

/// Write `bytes` to `path` through a temp file and rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Persistence(format!("No parent directory for {:?}", path)))?;
    tokio::fs::create_dir_all(dir).await?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("snapshot");
    let tmp = dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value)
        .map_err(|e| Error::Persistence(format!("Failed to serialize {}: {}", what, e)))
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Persistence(format!("Failed to parse {:?}: {}", path, e)))
}

/// Persist the list of collection names.
pub(crate) async fn save_manifest(base: &Path, mut names: Vec<String>) -> Result<()> {
    names.sort();
    let manifest = Manifest { collections: names };
    write_atomic(&base.join(MANIFEST_FILE), &to_json(&manifest, "manifest")?).await
}

/// Read the list of collection names; a missing manifest means none.
pub(crate) async fn load_manifest(base: &Path) -> Result<Vec<String>> {
    let path = base.join(MANIFEST_FILE);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(Vec::new());
    }
    let manifest: Manifest = read_json(&path).await?;
    Ok(manifest.collections)
}

/// Persist a collection's descriptive metadata.
pub(crate) async fn save_metadata(base: &Path, collection: &Collection) -> Result<()> {
    let metadata = CollectionMetadata::of(collection);
    let path = collection_dir(base, collection.name()).join(METADATA_FILE);
    write_atomic(&path, &to_json(&metadata, "collection metadata")?).await
}

/// Persist a full record snapshot for collection `name`.
pub(crate) async fn save_records(base: &Path, name: &str, records: &[Record]) -> Result<()> {
    let path = collection_dir(base, name).join(RECORDS_FILE);
    write_atomic(&path, &to_json(&records, "records")?).await?;
    debug!(name, count = records.len(), "Saved records");
    Ok(())
}

/// Load one collection from disk.
pub(crate) async fn load_collection(base: &Path, name: &str) -> Result<Collection> {
    let dir = collection_dir(base, name);
    if !tokio::fs::try_exists(&dir).await? {
        return Err(Error::CollectionNotFound(name.to_string()));
    }

    let metadata: CollectionMetadata = read_json(&dir.join(METADATA_FILE)).await?;
    if metadata.name != name {
        return Err(Error::Persistence(format!(
            "Metadata in {:?} names collection '{}'",
            dir, metadata.name
        )));
    }

    let records_path = dir.join(RECORDS_FILE);
    let records: Vec<Record> = if tokio::fs::try_exists(&records_path).await? {
        read_json(&records_path).await?
    } else {
        Vec::new()
    };

    let count = records.len();
    let collection = Collection::restore(
        metadata.name,
        metadata.dimensions,
        metadata.metric,
        metadata.provider,
        metadata.created_at,
        records,
    )?;

    info!(name, dimensions = metadata.dimensions, count, "Loaded collection");
    Ok(collection)
}

/// Remove a collection directory.
pub(crate) async fn delete_collection(base: &Path, name: &str) -> Result<()> {
    let dir = collection_dir(base, name);
    if tokio::fs::try_exists(&dir).await? {
        tokio::fs::remove_dir_all(&dir).await?;
    }
    Ok(())
}
