//! Raw document storage and text extraction.
//!
//! Uploaded bytes are kept as-is so a document can be re-indexed later.
//! Plain text, Markdown and PDF are extracted; other formats produce empty
//! text, which ingestion accepts as a no-op.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a stored document ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Name the document was uploaded with.
    pub filename: String,
    /// Backend-specific handle, `local://{stored name}` for the local store.
    pub location: String,
    pub size_bytes: usize,
    pub stored_at: DateTime<Utc>,
}

/// Save bytes, get bytes back.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<StoredDocument>;

    async fn load(&self, location: &str) -> Result<Vec<u8>>;
}

const LOCAL_SCHEME: &str = "local://";

/// Files under one directory, named `{uuid}_{filename}`.
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, location: &str) -> Result<PathBuf> {
        let name = location.strip_prefix(LOCAL_SCHEME).ok_or_else(|| {
            AppError::InvalidInput(format!("'{}' is not a local document location", location))
        })?;
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(AppError::InvalidInput(format!(
                "Invalid document location '{}'",
                location
            )));
        }
        Ok(self.root.join(name))
    }
}

/// Keep only the final path component of an uploaded name.
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "document".to_string()
    } else {
        base.to_string()
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<StoredDocument> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let stored_name = format!("{}_{}", uuid::Uuid::new_v4(), sanitize_filename(filename));
        let path = self.root.join(&stored_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AppError::Internal(format!("Failed to write {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), size = bytes.len(), "Stored document");
        Ok(StoredDocument {
            filename: filename.to_string(),
            location: format!("{}{}", LOCAL_SCHEME, stored_name),
            size_bytes: bytes.len(),
            stored_at: Utc::now(),
        })
    }

    async fn load(&self, location: &str) -> Result<Vec<u8>> {
        let path = self.resolve(location)?;
        tokio::fs::read(&path).await.map_err(|e| {
            AppError::Internal(format!("Failed to read {}: {}", path.display(), e))
        })
    }
}

/// Extract indexable text from an uploaded file.
///
/// `.txt` and `.md` are decoded as UTF-8, replacing invalid sequences.
/// `.pdf` text is pulled out with `pdf-extract`. Any other extension yields
/// an empty string, which ingestion treats as nothing to index.
///
/// # Errors
///
/// `InvalidInput` when a PDF cannot be parsed.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("txt") | Some("md") => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Some("pdf") => extract_pdf(filename, bytes),
        _ => Ok(String::new()),
    }
}

fn extract_pdf(filename: &str, bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed files
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match extracted {
        Ok(Ok(text)) => {
            debug!(filename, chars = text.len(), "Extracted PDF text");
            Ok(text)
        }
        Ok(Err(e)) => Err(AppError::InvalidInput(format!(
            "Failed to read PDF {}: {}",
            filename, e
        ))),
        Err(_) => Err(AppError::InvalidInput(format!(
            "Failed to read PDF {}: malformed document",
            filename
        ))),
    }
}
