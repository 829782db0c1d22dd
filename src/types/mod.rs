use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= Answer Types =============

/// Answer returned when retrieval finds nothing to ground on.
pub const NO_CONTEXT_ANSWER: &str = "I cannot find this information in the provided documents.";

/// `model_used` tag for the no-context path.
pub const MODEL_TAG_NO_CONTEXT: &str = "no-context";
/// `model_used` tag when every local model failed and an excerpt was returned.
pub const MODEL_TAG_FALLBACK: &str = "fallback";
/// `model_used` tag for a terminal remote failure.
pub const MODEL_TAG_ERROR: &str = "error";

/// A retrieved document as shown to the caller.
///
/// One entry per filename; `content` is a preview of the best-ranked chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDoc {
    pub doc_id: String,
    pub filename: String,
    pub content: String,
    /// Cosine similarity of the chunk, higher is closer.
    pub relevance_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<SourceDoc>,
    pub model_used: String,
}

impl AnswerResult {
    /// True for the canned, excerpt and error answers.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self.model_used.as_str(),
            MODEL_TAG_NO_CONTEXT | MODEL_TAG_FALLBACK | MODEL_TAG_ERROR
        )
    }
}

/// Which generation backend answers a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// Ordered list of Ollama models, smallest first.
    #[default]
    Local,
    /// OpenAI-compatible chat completions.
    Remote,
}

impl ModelChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Local => "local",
            ModelChoice::Remote => "remote",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelChoice {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "ollama" => Ok(ModelChoice::Local),
            "remote" | "openai" => Ok(ModelChoice::Remote),
            other => Err(AppError::InvalidInput(format!(
                "Unknown model '{}', expected 'local' or 'remote'",
                other
            ))),
        }
    }
}

// ============= Ingestion Types =============

/// Metadata attached to every chunk of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub doc_id: String,
    pub filename: String,
}

impl DocumentMetadata {
    pub fn new(doc_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            filename: filename.into(),
        }
    }
}

/// Outcome of a successful `ingest` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub doc_id: String,
    /// Chunks written by this call. Zero for whitespace-only input.
    pub chunks: usize,
    /// Records stored for the document after the call.
    pub stored_for_doc: usize,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Index I/O error: {0}")]
    IndexIo(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<askmydocs_vector::Error> for AppError {
    fn from(err: askmydocs_vector::Error) -> Self {
        use askmydocs_vector::Error as VectorError;

        match err {
            VectorError::Io(_) | VectorError::Persistence(_) => AppError::IndexIo(err.to_string()),
            VectorError::DimensionMismatch { .. }
            | VectorError::InvalidVector(_)
            | VectorError::InvalidBatch(_) => AppError::InvalidInput(err.to_string()),
            VectorError::ProviderMismatch { .. } => AppError::Configuration(format!(
                "{}. Re-index the documents or restore the previous embedding settings",
                err
            )),
            VectorError::CollectionExists(_) | VectorError::CollectionNotFound(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
