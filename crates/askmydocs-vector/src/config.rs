//! Configuration for askmydocs-vector.

use std::path::PathBuf;

/// Configuration for the vector database.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Directory holding the persisted collections. `None` keeps everything
    /// in memory and nothing survives the process.
    pub data_path: Option<PathBuf>,

    /// Maximum number of records per collection (0 = unlimited).
    pub max_records: usize,
}

impl Config {
    /// In-memory configuration, used by tests and ephemeral runs.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Persistent configuration rooted at `path`.
    ///
    /// Existing collections under `path` are loaded when the database opens,
    /// and every successful upsert is written through before it returns.
    pub fn persistent<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            data_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Cap the number of records a single collection may hold.
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }

    /// Whether writes go to disk.
    pub fn is_persistent(&self) -> bool {
        self.data_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config() {
        let config = Config::memory();
        assert!(config.data_path.is_none());
        assert!(!config.is_persistent());
        assert_eq!(config.max_records, 0);
    }

    #[test]
    fn test_persistent_config() {
        let config = Config::persistent("/tmp/vectors").with_max_records(10);
        assert!(config.is_persistent());
        assert_eq!(config.max_records, 10);
    }
}
