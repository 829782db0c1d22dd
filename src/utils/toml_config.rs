//! TOML-based configuration for AskMyDocs
//!
//! All settings live in one file (`askmydocs.toml`). Every field has a
//! default, so a missing file, section or key falls back to the values
//! documented on each `default_*` function. Secrets never appear in the file:
//! it names the environment variable that holds them.
//!
//! The deployment variables of the original service (`LLM_PROVIDER`,
//! `OLLAMA_HOST`, `OLLAMA_PORT`, `OLLAMA_MODEL`, `OLLAMA_API_URL`) override
//! the file when set; see [`AskConfig::apply_env_overrides`].

use crate::rag::chunker::ChunkingStrategy;
use crate::types::ModelChoice;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// OpenAI key value shipped in sample `.env` files; treated as "not set".
pub const PLACEHOLDER_API_KEY: &str = "sk-dummy-key";

/// Root configuration structure loaded from askmydocs.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub openai: OpenAIConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= Embedding Configuration =============

/// Which backend turns text into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    /// Ollama `/api/embed`
    #[default]
    Local,
    /// OpenAI-compatible `/embeddings`
    Remote,
}

impl EmbeddingBackendKind {
    pub fn from_provider_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "ollama" | "local" => Some(Self::Local),
            "openai" | "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackendKind,

    /// Model used by the local backend
    #[serde(default = "default_ollama_embedding_model")]
    pub ollama_model: String,

    /// Model used by the remote backend
    #[serde(default = "default_openai_embedding_model")]
    pub openai_model: String,

    /// Expected vector size; enforced from the first call when set
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Per-call timeout
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Texts sent per remote request
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_embedding_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackendKind::default(),
            ollama_model: default_ollama_embedding_model(),
            openai_model: default_openai_embedding_model(),
            dimensions: None,
            timeout_secs: default_embedding_timeout(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

// ============= Ollama Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Host, with or without scheme (`ollama`, `http://localhost`)
    #[serde(default = "default_ollama_host")]
    pub host: String,

    #[serde(default = "default_ollama_port")]
    pub port: u16,

    /// Full URL for generation; defaults to `host:port`
    #[serde(default)]
    pub api_url: Option<String>,

    /// Generation models, tried in order (smallest first)
    #[serde(default = "default_ollama_models")]
    pub models: Vec<String>,

    #[serde(default)]
    pub temperature: f32,

    /// Per-model generation timeout
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_ollama_host() -> String {
    "http://localhost".to_string()
}

fn default_ollama_port() -> u16 {
    11434
}

fn default_ollama_models() -> Vec<String> {
    vec!["llama3.2:1b".to_string(), "llama3".to_string()]
}

fn default_generation_timeout() -> u64 {
    60
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            port: default_ollama_port(),
            api_url: None,
            models: default_ollama_models(),
            temperature: 0.0,
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl OllamaConfig {
    /// `scheme://host:port` used for embeddings.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.contains("://") {
            format!("{}:{}", host, self.port)
        } else {
            format!("http://{}:{}", host, self.port)
        }
    }

    /// URL used for generation: `api_url` when set, else [`Self::base_url`].
    pub fn generation_url(&self) -> String {
        match &self.api_url {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => self.base_url(),
        }
    }
}

// ============= OpenAI Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default = "default_openai_base")]
    pub api_base: String,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    /// Chat completion model
    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_openai_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_max_tokens() -> u32 {
    150
}

fn default_openai_temperature() -> f32 {
    0.1
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_base(),
            api_key_env: default_openai_key_env(),
            model: default_openai_model(),
            max_tokens: default_openai_max_tokens(),
            temperature: default_openai_temperature(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default)]
    pub chunking_strategy: ChunkingStrategy,

    /// Chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Characters of chunk text shown per source
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Characters of the best source quoted when every local model fails
    #[serde(default = "default_fallback_excerpt_chars")]
    pub fallback_excerpt_chars: usize,

    #[serde(default)]
    pub default_model: ModelChoice,

    /// Vector collection holding document chunks
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    5
}

fn default_preview_chars() -> usize {
    200
}

fn default_fallback_excerpt_chars() -> usize {
    500
}

fn default_collection() -> String {
    "documents".to_string()
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            chunking_strategy: ChunkingStrategy::default(),
            top_k: default_top_k(),
            preview_chars: default_preview_chars(),
            fallback_excerpt_chars: default_fallback_excerpt_chars(),
            default_model: ModelChoice::default(),
            collection: default_collection(),
        }
    }
}

// ============= Storage Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the persistent vector index
    #[serde(default = "default_vector_path")]
    pub vector_path: PathBuf,

    /// Directory where uploaded files are kept
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
}

fn default_vector_path() -> PathBuf {
    PathBuf::from("./data/vectors")
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            vector_path: default_vector_path(),
            documents_dir: default_documents_dir(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' has no usable API key")]
    MissingEnvVar(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

impl AskConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load the file if it exists, otherwise start from defaults. Env
    /// overrides are applied and the result validated either way.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            debug!(path = %path.display(), "No configuration file, using defaults");
            AskConfig::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate without touching the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AskConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the original deployment variables on top of the file.
    ///
    /// `lookup` abstracts `std::env::var` so tests don't mutate the process
    /// environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("LLM_PROVIDER") {
            match EmbeddingBackendKind::from_provider_name(&provider) {
                Some(kind) => self.embedding.backend = kind,
                None => warn!(value = %provider, "Ignoring unknown LLM_PROVIDER"),
            }
        }
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.ollama.host = host;
        }
        if let Some(port) = lookup("OLLAMA_PORT") {
            match port.trim().parse() {
                Ok(port) => self.ollama.port = port,
                Err(_) => warn!(value = %port, "Ignoring non-numeric OLLAMA_PORT"),
            }
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.embedding.ollama_model = model;
        }
        if let Some(url) = lookup("OLLAMA_API_URL") {
            self.ollama.api_url = Some(url);
        }
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "rag.top_k must be at least 1".to_string(),
            ));
        }
        if self.rag.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "rag.collection must not be empty".to_string(),
            ));
        }
        if self.ollama.models.iter().all(|m| m.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "ollama.models must list at least one model".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimensions == Some(0) {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// OpenAI API key, if a usable one is configured.
    ///
    /// Empty values and the sample placeholder count as missing.
    pub fn openai_api_key(&self) -> Result<String, ConfigError> {
        usable_api_key(self.resolve_env(&self.openai.api_key_env))
            .ok_or_else(|| ConfigError::MissingEnvVar(self.openai.api_key_env.clone()))
    }

    /// Render the configuration back to TOML, used by `askmydocs init`.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(format!("Failed to render TOML: {}", e)))
    }
}

/// Filter out blank and placeholder keys.
pub fn usable_api_key(raw: Option<String>) -> Option<String> {
    raw.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
}
