//! Embedding providers.
//!
//! An [`EmbeddingProvider`] turns text into fixed-size vectors. The backend
//! is picked once at startup by [`EmbeddingBackend::create_provider`]:
//!
//! - `local`: an Ollama server (`/api/embed`)
//! - `remote`: any OpenAI-compatible `/embeddings` endpoint
//!
//! A misconfigured backend yields a [`NullEmbedder`] whose every call fails
//! with `ProviderUnavailable`; nothing ever fabricates zero vectors.
//!
//! Each provider locks in the vector size of its first successful response
//! (or the configured `dimensions`) and rejects anything different after
//! that, so one index never mixes sizes.

use crate::types::{AppError, Result};
use crate::utils::toml_config::{usable_api_key, AskConfig, EmbeddingBackendKind};
#[cfg(feature = "openai")]
use async_openai::{config::OpenAIConfig, types::embeddings::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
#[cfg(feature = "openai")]
use futures::{stream, StreamExt, TryStreamExt};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Remote requests in flight per `embed` call.
#[cfg(feature = "openai")]
const REMOTE_CONCURRENCY: usize = 4;

/// Text-to-vector backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `texts`, returning one vector per input in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            AppError::ProviderUnavailable(format!("{} returned no embedding", self.identity()))
        })
    }

    /// Vector size, once known.
    fn dimensions(&self) -> Option<usize>;

    /// `"{backend}:{model}"`, recorded in the index to detect provider changes.
    fn identity(&self) -> String;
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Remembers the vector size and rejects responses that disagree with it.
#[derive(Debug, Default)]
pub struct DimensionLock {
    dims: Mutex<Option<usize>>,
}

impl DimensionLock {
    pub fn new(expected: Option<usize>) -> Self {
        Self {
            dims: Mutex::new(expected),
        }
    }

    pub fn get(&self) -> Option<usize> {
        *self.dims.lock()
    }

    /// Validate a response batch and lock its size if none is set yet.
    pub fn check(&self, identity: &str, vectors: &[Vec<f32>]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let len = first.len();
        if len == 0 {
            return Err(AppError::ProviderUnavailable(format!(
                "{} returned an empty embedding",
                identity
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != len) {
            return Err(AppError::ProviderUnavailable(format!(
                "{} returned embeddings of mixed sizes ({} and {})",
                identity,
                len,
                bad.len()
            )));
        }

        let mut dims = self.dims.lock();
        match *dims {
            Some(expected) if expected != len => Err(AppError::ProviderUnavailable(format!(
                "{} returned {}-dimensional embeddings, expected {}",
                identity, len, expected
            ))),
            Some(_) => Ok(()),
            None => {
                *dims = Some(len);
                Ok(())
            }
        }
    }
}

/// Run `fut` with a deadline; expiry is `ProviderUnavailable`.
pub(crate) async fn with_timeout<T, F>(timeout: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::ProviderUnavailable(format!(
            "{} timed out after {}s",
            what,
            timeout.as_secs_f32()
        ))),
    }
}

fn ensure_count(identity: &str, expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(AppError::ProviderUnavailable(format!(
            "{} returned {} embeddings for {} inputs",
            identity,
            vectors.len(),
            expected
        )));
    }
    Ok(())
}

// ============================================================================
// Ollama
// ============================================================================

/// Embeddings from a local Ollama server.
#[cfg(feature = "ollama")]
pub struct OllamaEmbedder {
    client: ollama_rs::Ollama,
    model: String,
    timeout: Duration,
    dims: DimensionLock,
}

#[cfg(feature = "ollama")]
impl OllamaEmbedder {
    pub fn new(base_url: &str, model: String, timeout: Duration, dims: Option<usize>) -> Result<Self> {
        Ok(Self {
            client: crate::llm::ollama::connect(base_url)?,
            model,
            timeout,
            dims: DimensionLock::new(dims),
        })
    }
}

#[cfg(feature = "ollama")]
#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use ollama_rs::generation::embeddings::request::{
            EmbeddingsInput, GenerateEmbeddingsRequest,
        };

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let identity = self.identity();
        let request = GenerateEmbeddingsRequest::new(
            self.model.clone(),
            EmbeddingsInput::Multiple(texts.to_vec()),
        );

        let response = with_timeout(self.timeout, &identity, async {
            self.client
                .generate_embeddings(request)
                .await
                .map_err(|e| AppError::ProviderUnavailable(format!("Ollama embedding error: {}", e)))
        })
        .await?;

        let vectors = response.embeddings;
        ensure_count(&identity, texts.len(), &vectors)?;
        self.dims.check(&identity, &vectors)?;
        debug!(model = %self.model, count = vectors.len(), "Embedded texts");
        Ok(vectors)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dims.get()
    }

    fn identity(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

// ============================================================================
// OpenAI-compatible
// ============================================================================

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
#[cfg(feature = "openai")]
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
    batch_size: usize,
    dims: DimensionLock,
}

#[cfg(feature = "openai")]
impl OpenAIEmbedder {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        batch_size: usize,
        dims: Option<usize>,
    ) -> Self {
        let api_base: String = api_base.into();
        let config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(api_base.trim_end_matches('/'));

        Self {
            client: Client::with_config(config),
            model: model.into(),
            timeout,
            batch_size: batch_size.max(1),
            dims: DimensionLock::new(dims),
        }
    }

    /// One request, bounded by the timeout, checked for a vector per input.
    async fn embed_batch(&self, batch: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let identity = self.identity();
        let expected = batch.len();

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(batch)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build embedding request: {}", e)))?;

        let mut response = with_timeout(self.timeout, &identity, async {
            self.client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| AppError::ProviderUnavailable(format!("OpenAI embedding error: {}", e)))
        })
        .await?;

        response.data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        ensure_count(&identity, expected, &vectors)?;
        Ok(vectors)
    }
}

#[cfg(feature = "openai")]
#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let pending = texts
            .chunks(self.batch_size)
            .map(<[String]>::to_vec)
            .map(|batch| self.embed_batch(batch));
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(pending)
            .buffered(REMOTE_CONCURRENCY)
            .try_collect()
            .await?;

        let vectors: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        self.dims.check(&self.identity(), &vectors)?;
        debug!(model = %self.model, count = vectors.len(), "Embedded texts");
        Ok(vectors)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dims.get()
    }

    fn identity(&self) -> String {
        format!("openai:{}", self.model)
    }
}

// ============================================================================
// Unavailable backend
// ============================================================================

/// Stand-in for a backend that could not be configured.
pub struct NullEmbedder {
    identity: String,
    reason: String,
}

impl NullEmbedder {
    pub fn new(identity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(AppError::ProviderUnavailable(self.reason.clone()))
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Embedding backend selection, resolved once from configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingBackend {
    Ollama {
        base_url: String,
        model: String,
        timeout_secs: u64,
        dimensions: Option<usize>,
    },
    OpenAI {
        api_base: String,
        /// `None` when unset or a placeholder
        api_key: Option<String>,
        model: String,
        timeout_secs: u64,
        batch_size: usize,
        dimensions: Option<usize>,
    },
}

impl EmbeddingBackend {
    pub fn from_config(config: &AskConfig) -> Self {
        let embedding = &config.embedding;
        match embedding.backend {
            EmbeddingBackendKind::Local => EmbeddingBackend::Ollama {
                base_url: config.ollama.base_url(),
                model: embedding.ollama_model.clone(),
                timeout_secs: embedding.timeout_secs,
                dimensions: embedding.dimensions,
            },
            EmbeddingBackendKind::Remote => EmbeddingBackend::OpenAI {
                api_base: config.openai.api_base.clone(),
                api_key: usable_api_key(config.resolve_env(&config.openai.api_key_env)),
                model: embedding.openai_model.clone(),
                timeout_secs: embedding.timeout_secs,
                batch_size: embedding.batch_size,
                dimensions: embedding.dimensions,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbeddingBackend::Ollama { .. } => "ollama",
            EmbeddingBackend::OpenAI { .. } => "openai",
        }
    }

    pub fn identity(&self) -> String {
        match self {
            EmbeddingBackend::Ollama { model, .. } => format!("ollama:{}", model),
            EmbeddingBackend::OpenAI { model, .. } => format!("openai:{}", model),
        }
    }

    /// Build the provider. Never fails: problems yield a [`NullEmbedder`].
    pub fn create_provider(&self) -> Arc<dyn EmbeddingProvider> {
        match self {
            #[cfg(feature = "ollama")]
            EmbeddingBackend::Ollama {
                base_url,
                model,
                timeout_secs,
                dimensions,
            } => match OllamaEmbedder::new(
                base_url,
                model.clone(),
                Duration::from_secs(*timeout_secs),
                *dimensions,
            ) {
                Ok(embedder) => Arc::new(embedder),
                Err(e) => {
                    warn!(error = %e, "Ollama embedding backend unavailable");
                    Arc::new(NullEmbedder::new(self.identity(), e.to_string()))
                }
            },
            #[cfg(not(feature = "ollama"))]
            EmbeddingBackend::Ollama { .. } => Arc::new(NullEmbedder::new(
                self.identity(),
                "Ollama support is not compiled in (enable the `ollama` feature)",
            )),
            #[cfg(feature = "openai")]
            EmbeddingBackend::OpenAI {
                api_base,
                api_key,
                model,
                timeout_secs,
                batch_size,
                dimensions,
            } => match api_key {
                Some(key) => Arc::new(OpenAIEmbedder::new(
                    api_base.clone(),
                    key.clone(),
                    model.clone(),
                    Duration::from_secs(*timeout_secs),
                    *batch_size,
                    *dimensions,
                )),
                None => {
                    warn!("OpenAI API key missing, remote embeddings unavailable");
                    Arc::new(NullEmbedder::new(
                        self.identity(),
                        "OpenAI API key not configured. Set a valid OPENAI_API_KEY environment variable.",
                    ))
                }
            },
            #[cfg(not(feature = "openai"))]
            EmbeddingBackend::OpenAI { .. } => Arc::new(NullEmbedder::new(
                self.identity(),
                "OpenAI support is not compiled in (enable the `openai` feature)",
            )),
        }
    }
}
