//! Error types for askmydocs-vector.

use thiserror::Error;

/// Result type for askmydocs-vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in askmydocs-vector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Collection already exists.
    #[error("Collection '{0}' already exists")]
    CollectionExists(String),

    /// Collection not found.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// Dimension mismatch between vector and collection.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions.
        expected: usize,
        /// Actual dimensions provided.
        actual: usize,
    },

    /// Invalid vector (e.g., empty, contains NaN).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Batch shape error (mismatched lengths, duplicate ids in one batch).
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// The collection was built by a different embedding provider.
    #[error("Collection '{collection}' was indexed with '{stored}', but '{requested}' is configured")]
    ProviderMismatch {
        /// Collection name.
        collection: String,
        /// Provider identity recorded at creation.
        stored: String,
        /// Provider identity requested now.
        requested: String,
    },

    /// Persistence error (serialization, corrupt files).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
