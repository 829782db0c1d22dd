//! The RAG orchestrator: `ingest` and `answer`.
//!
//! A [`RagPipeline`] is built once at startup and shared (`Arc`) by every
//! request. It owns no global state, so tests build their own with mock
//! providers through [`RagPipeline::from_parts`].

use crate::db::{IndexStats, VectorIndex, VectorIndexProvider};
use crate::rag::chunker::Chunker;
use crate::rag::embeddings::{EmbeddingBackend, EmbeddingProvider};
use crate::rag::generator::AnswerGenerator;
use crate::rag::retriever::{Retriever, DEFAULT_TOP_K};
use crate::types::{
    AnswerResult, AppError, DocumentMetadata, IngestReport, ModelChoice, Result, SourceDoc,
};
use crate::utils::toml_config::AskConfig;
use askmydocs_vector::VectorMetadata;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

pub struct RagPipeline {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    retriever: Retriever,
    generator: AnswerGenerator,
    top_k: usize,
    default_model: ModelChoice,
}

impl RagPipeline {
    /// Build every component from configuration and open the on-disk index.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for bad chunker settings, `IndexIo` if the index
    /// cannot be read, `Configuration` if it was built by another
    /// embedding provider.
    pub async fn open(config: &AskConfig) -> Result<Self> {
        let backend = EmbeddingBackend::from_config(config);
        let embedder = backend.create_provider();
        let index = VectorIndexProvider::from_storage(&config.storage)
            .open(&config.rag.collection, &embedder.identity())
            .await?;

        let chunker = Chunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?
            .with_strategy(config.rag.chunking_strategy);

        info!(
            backend = backend.name(),
            embedding = %embedder.identity(),
            collection = %config.rag.collection,
            "RAG pipeline ready"
        );

        Ok(
            Self::from_parts(chunker, embedder, index, AnswerGenerator::from_config(config))
                .with_top_k(config.rag.top_k)
                .with_preview_chars(config.rag.preview_chars)
                .with_default_model(config.rag.default_model),
        )
    }

    pub fn from_parts(
        chunker: Chunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        generator: AnswerGenerator,
    ) -> Self {
        let retriever = Retriever::new(embedder.clone(), index.clone());
        Self {
            chunker,
            embedder,
            index,
            retriever,
            generator,
            top_k: DEFAULT_TOP_K,
            default_model: ModelChoice::default(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.retriever = self.retriever.with_preview_chars(preview_chars);
        self
    }

    pub fn with_default_model(mut self, model: ModelChoice) -> Self {
        self.default_model = model;
        self
    }

    pub fn default_model(&self) -> ModelChoice {
        self.default_model
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Chunk, embed and store one document.
    ///
    /// Whitespace-only `text` is accepted and stores nothing. Chunk ids are
    /// `"{doc_id}_{chunk_index}"`, so ingesting the same document again
    /// overwrites its chunks instead of duplicating them.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty `doc_id`, `ProviderUnavailable` when
    /// embedding fails, `IndexIo` when the batch cannot be persisted.
    #[instrument(skip(self, text, metadata), fields(filename = %metadata.filename, len = text.len()))]
    pub async fn ingest(
        &self,
        doc_id: &str,
        text: &str,
        metadata: DocumentMetadata,
    ) -> Result<IngestReport> {
        let doc_id = doc_id.trim();
        if doc_id.is_empty() {
            return Err(AppError::InvalidInput("doc_id must not be empty".into()));
        }

        if text.trim().is_empty() {
            debug!(doc_id, "Empty document, nothing to index");
            return Ok(IngestReport {
                doc_id: doc_id.to_string(),
                chunks: 0,
                stored_for_doc: self.index.count_by_doc(doc_id).await?,
            });
        }

        let started = Instant::now();
        let chunks = self.chunker.split(text)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let ids = chunks
            .iter()
            .map(|c| format!("{}_{}", doc_id, c.index))
            .collect();
        let metadatas = chunks
            .iter()
            .map(|c| {
                let mut meta = VectorMetadata::new();
                meta.insert("doc_id", doc_id);
                meta.insert("filename", metadata.filename.as_str());
                meta.insert("chunk_index", c.index);
                meta
            })
            .collect();

        let written = self.index.upsert(ids, vectors, texts, metadatas).await?;
        let stored_for_doc = self.index.count_by_doc(doc_id).await?;

        info!(
            doc_id,
            chunks = written,
            stored_for_doc,
            duration_ms = started.elapsed().as_millis() as u64,
            "Ingested document"
        );

        Ok(IngestReport {
            doc_id: doc_id.to_string(),
            chunks: written,
            stored_for_doc,
        })
    }

    /// Deduplicated sources for `query`. Never fails.
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<SourceDoc> {
        self.retriever.retrieve(query, k).await
    }

    /// Answer `question` from the indexed documents.
    ///
    /// Backend failures never surface here: they come back as degraded
    /// answers tagged `fallback` or `error`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `question` is empty or whitespace.
    #[instrument(skip(self, question), fields(model = %model))]
    pub async fn answer(&self, question: &str, model: ModelChoice) -> Result<AnswerResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("question must not be empty".into()));
        }

        let started = Instant::now();
        let context = self.retriever.retrieve_context(question, self.top_k).await;
        let outcome = self.generator.generate(question, context, model).await;
        let state = outcome.state();
        let result = AnswerResult::from(outcome);

        info!(
            ?state,
            model_used = %result.model_used,
            sources = result.sources.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Answered question"
        );
        Ok(result)
    }

    /// Index statistics.
    pub async fn stats(&self) -> Result<IndexStats> {
        self.index.stats().await
    }
}
