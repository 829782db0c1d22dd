//! Query-time retrieval: embed, search, shape.
//!
//! The retriever never fails. An empty index, an unavailable embedding
//! backend and a search error all come back as "no context", which the
//! answer generator turns into the canned no-context answer.

use crate::db::VectorIndex;
use crate::rag::embeddings::EmbeddingProvider;
use crate::types::SourceDoc;
use askmydocs_vector::SearchResult;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_PREVIEW_CHARS: usize = 200;

/// One retrieved chunk with its full text, used to build the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextPassage {
    pub doc_id: String,
    pub filename: String,
    pub text: String,
    pub score: f32,
}

/// Everything retrieval produced for one question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    /// All hits, best-first, untruncated.
    pub passages: Vec<ContextPassage>,
    /// One preview per filename, in rank order.
    pub sources: Vec<SourceDoc>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    preview_chars: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Deduplicated source previews for `query`, best-first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<SourceDoc> {
        self.retrieve_context(query, k).await.sources
    }

    /// Full passages plus deduplicated previews for `query`.
    pub async fn retrieve_context(&self, query: &str, k: usize) -> RetrievedContext {
        let query_vector = match self.embedder.embed_query(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "Query embedding failed, continuing without context");
                return RetrievedContext::default();
            }
        };

        let hits = match self.index.search(&query_vector, k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Vector search failed, continuing without context");
                return RetrievedContext::default();
            }
        };

        let context = shape(hits, self.preview_chars);
        debug!(
            hits = context.passages.len(),
            sources = context.sources.len(),
            "Retrieved context"
        );
        context
    }
}

/// Turn raw hits into passages and filename-deduplicated previews.
pub fn shape(hits: Vec<SearchResult>, preview_chars: usize) -> RetrievedContext {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    let mut passages = Vec::with_capacity(hits.len());

    for (rank, hit) in hits.into_iter().enumerate() {
        let filename = hit
            .metadata
            .get_string("filename")
            .map(str::to_string)
            .unwrap_or_else(|| format!("document_{}", rank));
        let doc_id = hit
            .metadata
            .get("doc_id")
            .map(|v| v.to_text())
            .unwrap_or_else(|| hit.id.clone());

        if seen.insert(filename.clone()) {
            sources.push(SourceDoc {
                doc_id: doc_id.clone(),
                filename: filename.clone(),
                content: preview(&hit.text, preview_chars),
                relevance_score: hit.score,
            });
        }

        passages.push(ContextPassage {
            doc_id,
            filename,
            text: hit.text,
            score: hit.score,
        });
    }

    RetrievedContext { passages, sources }
}

/// First `max_chars` chars of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
