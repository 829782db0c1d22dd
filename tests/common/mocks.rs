//! Mock implementations for testing.
//!
//! Deterministic stand-ins for the embedding and LLM backends so pipeline
//! tests run without Ollama or network access.

#![allow(dead_code)]

use askmydocs::llm::LLMClient;
use askmydocs::rag::EmbeddingProvider;
use askmydocs::types::{AppError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::{Request, Respond, ResponseTemplate};

/// Vector size produced by [`BagOfWordsEmbedder`].
pub const BOW_DIMS: usize = 64;

/// Hashes lowercase words into a fixed number of buckets.
///
/// Texts that share words get a positive cosine similarity, which is all
/// the retrieval tests need.
pub struct BagOfWordsEmbedder {
    calls: AtomicUsize,
}

impl BagOfWordsEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; BOW_DIMS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(5381u64, |h, b| h.wrapping_mul(33) ^ u64::from(b));
            vector[(bucket % BOW_DIMS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(BOW_DIMS)
    }

    fn identity(&self) -> String {
        "test:bag-of-words".to_string()
    }
}

/// Embedder whose backend is always down.
pub struct UnavailableEmbedder;

#[async_trait]
impl EmbeddingProvider for UnavailableEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(AppError::ProviderUnavailable(
            "mock embedder is offline".to_string(),
        ))
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }

    fn identity(&self) -> String {
        "test:bag-of-words".to_string()
    }
}

/// Mock LLM client with a fixed reply, or a fixed failure.
///
/// Records every prompt it receives.
pub struct MockLLMClient {
    model: String,
    response: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLLMClient {
    /// Client that always answers `response`.
    pub fn new(model: &str, response: &str) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            response: Some(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Client that always fails as if the server were unreachable.
    pub fn failing(model: &str) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            response: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.response
            .clone()
            .ok_or_else(|| AppError::LLM("Mock LLM failure".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Answers `/embeddings` with bag-of-words vectors for each input.
pub struct EmbeddingResponder;

impl Respond for EmbeddingResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let data: Vec<Value> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .enumerate()
                    .map(|(i, text)| {
                        json!({
                            "object": "embedding",
                            "index": i,
                            "embedding": BagOfWordsEmbedder::vector(text.as_str().unwrap_or_default()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": data,
            "model": "text-embedding-3-small",
            "usage": { "prompt_tokens": 0, "total_tokens": 0 },
        }))
    }
}
