//! End-to-end tests for the RAG pipeline with mocked backends.
//!
//! Embeddings come from a bag-of-words mock and answers from scripted LLM
//! clients, so these run offline. The vector index is real.

mod common;

use askmydocs::db::{VectorIndex, VectorIndexProvider};
use askmydocs::llm::LLMClient;
use askmydocs::rag::{AnswerGenerator, Chunker, EmbeddingProvider, RagPipeline, RemoteBackend};
use askmydocs::types::{
    AppError, DocumentMetadata, ModelChoice, MODEL_TAG_ERROR, MODEL_TAG_FALLBACK,
    MODEL_TAG_NO_CONTEXT, NO_CONTEXT_ANSWER,
};
use common::mocks::{BagOfWordsEmbedder, MockLLMClient, UnavailableEmbedder};
use std::sync::Arc;
use tempfile::TempDir;

const ML_FILENAME: &str = "ml_basics.txt";

const UNCONFIGURED: &str =
    "OpenAI API key not configured. Please set a valid OPENAI_API_KEY environment variable.";

fn ml_document() -> String {
    [
        "Machine learning is a field of artificial intelligence that builds systems which learn from data. \
         Two of its main families are supervised learning and unsupervised learning.",
        "Supervised learning trains a model on labelled examples, where every input comes with the correct output. \
         The model learns a mapping from inputs to outputs and is evaluated on how well it predicts labels for new data. \
         Classification and regression are the classic supervised learning tasks, for example detecting spam email or predicting house prices.",
        "Unsupervised learning works with unlabelled data. Instead of predicting a known answer, the algorithm looks for structure in the data on its own. \
         Clustering groups similar items together, while dimensionality reduction compresses many features into a few informative ones. \
         Customer segmentation and anomaly detection are common unsupervised learning applications.",
        "Semi-supervised learning sits between the two and combines a small labelled set with a large unlabelled one. \
         Choosing between these approaches depends mostly on whether reliable labels are available and how expensive they are to collect. \
         Labelled data is usually the scarce resource in real projects, not compute.",
    ]
    .join("\n\n")
}

fn generator(local: Vec<Arc<dyn LLMClient>>) -> AnswerGenerator {
    AnswerGenerator::new(local, RemoteBackend::Unconfigured(UNCONFIGURED.to_string()))
}

async fn memory_index() -> Arc<dyn VectorIndex> {
    VectorIndexProvider::InMemory
        .open("documents", "test:bag-of-words")
        .await
        .unwrap()
}

fn pipeline(
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: AnswerGenerator,
) -> RagPipeline {
    RagPipeline::from_parts(Chunker::new(500, 100).unwrap(), embedder, index, generator)
}

async fn ingest_ml(pipeline: &RagPipeline, doc_id: &str) -> usize {
    pipeline
        .ingest(
            doc_id,
            &ml_document(),
            DocumentMetadata::new(doc_id, ML_FILENAME),
        )
        .await
        .unwrap()
        .chunks
}

// ============= Scenarios =============

#[tokio::test]
async fn test_supervised_learning_scenario() {
    let text = ml_document();
    let len = text.chars().count();
    assert!((1150..=1300).contains(&len), "document is {} chars", len);

    let llm = MockLLMClient::new(
        "llama3.2:1b",
        "Supervised learning trains a model on labelled examples.",
    );
    let local: Arc<dyn LLMClient> = llm.clone();
    let rag = pipeline(memory_index().await, BagOfWordsEmbedder::new(), generator(vec![local]));

    let chunks = ingest_ml(&rag, "1").await;
    assert!(chunks >= 2, "expected at least two chunks, got {}", chunks);

    for i in 0..chunks {
        let record = rag.index().get(&format!("1_{}", i)).await.unwrap().unwrap();
        assert!(record.text.chars().count() <= 500);
        assert_eq!(record.metadata.get_string("filename"), Some(ML_FILENAME));
        assert_eq!(record.metadata.get_int("chunk_index"), Some(i as i64));
    }

    let result = rag
        .answer("What is supervised learning?", ModelChoice::Local)
        .await
        .unwrap();

    assert!(!result.answer.is_empty());
    assert_ne!(result.answer, NO_CONTEXT_ANSWER);
    assert_eq!(result.model_used, "ollama-llama3.2:1b");
    assert!(!result.is_degraded());
    assert!(result.sources.iter().any(|s| s.filename == ML_FILENAME));
    assert!(result.sources.iter().all(|s| s.content.chars().count() <= 203));

    let prompt = llm.last_prompt().unwrap();
    assert!(prompt.contains(&format!("[Document 1: {}]", ML_FILENAME)));
    assert!(prompt.contains("Question: What is supervised learning?"));
}

#[tokio::test]
async fn test_empty_index_returns_canned_answer() {
    let llm = MockLLMClient::new("llama3", "should not be called");
    let local: Arc<dyn LLMClient> = llm.clone();
    let rag = pipeline(memory_index().await, BagOfWordsEmbedder::new(), generator(vec![local]));

    let result = rag
        .answer("What is supervised learning?", ModelChoice::Local)
        .await
        .unwrap();

    assert_eq!(result.answer, NO_CONTEXT_ANSWER);
    assert!(result.sources.is_empty());
    assert_eq!(result.model_used, MODEL_TAG_NO_CONTEXT);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_failing_local_models_fall_back_to_excerpt() {
    let chain: Vec<Arc<dyn LLMClient>> = vec![
        MockLLMClient::failing("llama3.2:1b"),
        MockLLMClient::failing("llama3"),
    ];
    let rag = pipeline(memory_index().await, BagOfWordsEmbedder::new(), generator(chain));
    ingest_ml(&rag, "1").await;

    let result = rag
        .answer("What is supervised learning?", ModelChoice::Local)
        .await
        .unwrap();

    assert_eq!(result.model_used, MODEL_TAG_FALLBACK);
    assert!(!result.answer.is_empty());
    assert!(result.answer.contains(ML_FILENAME));
    assert!(!result.sources.is_empty());
}

#[tokio::test]
async fn test_remote_without_key_is_terminal() {
    let rag = pipeline(
        memory_index().await,
        BagOfWordsEmbedder::new(),
        generator(Vec::new()),
    );
    ingest_ml(&rag, "1").await;

    let result = rag
        .answer("What is supervised learning?", ModelChoice::Remote)
        .await
        .unwrap();

    assert_eq!(result.model_used, MODEL_TAG_ERROR);
    assert_eq!(result.answer, UNCONFIGURED);
    assert!(result.sources.is_empty());
}

#[tokio::test]
async fn test_remote_backend_answers_when_configured() {
    let remote: Arc<dyn LLMClient> = MockLLMClient::new("gpt-3.5-turbo", "From the documents.");
    let rag = pipeline(
        memory_index().await,
        BagOfWordsEmbedder::new(),
        AnswerGenerator::new(Vec::new(), RemoteBackend::Configured(remote)),
    );
    ingest_ml(&rag, "1").await;

    let result = rag
        .answer("What is unsupervised learning?", ModelChoice::Remote)
        .await
        .unwrap();
    assert_eq!(result.model_used, "openai-gpt-3.5-turbo");
    assert_eq!(result.answer, "From the documents.");
}

// ============= Properties =============

#[tokio::test]
async fn test_sources_deduplicated_by_filename() {
    let local: Arc<dyn LLMClient> = MockLLMClient::new("llama3", "ok");
    let rag = pipeline(memory_index().await, BagOfWordsEmbedder::new(), generator(vec![local]));
    ingest_ml(&rag, "1").await;
    rag.ingest(
        "2",
        "Gardening notes: tomatoes need sun and regular watering.",
        DocumentMetadata::new("2", "garden.md"),
    )
    .await
    .unwrap();

    let sources = rag.retrieve("supervised learning labelled data", 10).await;
    let mut filenames: Vec<_> = sources.iter().map(|s| s.filename.clone()).collect();
    let total = filenames.len();
    filenames.sort();
    filenames.dedup();
    assert_eq!(filenames.len(), total);
    assert_eq!(sources[0].filename, ML_FILENAME);
}

#[tokio::test]
async fn test_retrieval_is_deterministic() {
    let rag = pipeline(
        memory_index().await,
        BagOfWordsEmbedder::new(),
        generator(Vec::new()),
    );
    ingest_ml(&rag, "1").await;
    ingest_ml(&rag, "2").await;

    let first = rag.retrieve("clustering unlabelled data", 5).await;
    for _ in 0..5 {
        assert_eq!(rag.retrieve("clustering unlabelled data", 5).await, first);
    }
}

#[tokio::test]
async fn test_reingest_is_idempotent() {
    let index = memory_index().await;
    let rag = pipeline(index.clone(), BagOfWordsEmbedder::new(), generator(Vec::new()));

    let first = rag
        .ingest("7", &ml_document(), DocumentMetadata::new("7", ML_FILENAME))
        .await
        .unwrap();
    let second = rag
        .ingest("7", &ml_document(), DocumentMetadata::new("7", ML_FILENAME))
        .await
        .unwrap();

    assert_eq!(first.chunks, second.chunks);
    assert_eq!(first.stored_for_doc, second.stored_for_doc);
    assert_eq!(index.count_by_doc("7").await.unwrap(), first.chunks);
    assert_eq!(index.count().await.unwrap(), first.chunks);
}

#[tokio::test]
async fn test_whitespace_document_is_a_noop() {
    let embedder = BagOfWordsEmbedder::new();
    let rag = pipeline(memory_index().await, embedder.clone(), generator(Vec::new()));

    let report = rag
        .ingest("3", "  \n\t ", DocumentMetadata::new("3", "blank.txt"))
        .await
        .unwrap();

    assert_eq!(report.chunks, 0);
    assert_eq!(report.stored_for_doc, 0);
    assert_eq!(embedder.calls(), 0);
    assert_eq!(rag.stats().await.unwrap().record_count, 0);
}

#[tokio::test]
async fn test_empty_question_rejected_before_retrieval() {
    let embedder = BagOfWordsEmbedder::new();
    let rag = pipeline(memory_index().await, embedder.clone(), generator(Vec::new()));

    let err = rag.answer("   ", ModelChoice::Local).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_embedding_outage() {
    let rag = pipeline(
        memory_index().await,
        Arc::new(UnavailableEmbedder),
        generator(Vec::new()),
    );

    let err = rag
        .ingest("1", &ml_document(), DocumentMetadata::new("1", ML_FILENAME))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProviderUnavailable(_)));

    // Queries still get an answer
    let result = rag
        .answer("What is supervised learning?", ModelChoice::Local)
        .await
        .unwrap();
    assert_eq!(result.model_used, MODEL_TAG_NO_CONTEXT);
}

// ============= Persistence and concurrency =============

#[tokio::test]
async fn test_index_survives_restart() {
    let dir = TempDir::new().unwrap();
    let provider = VectorIndexProvider::Disk {
        path: dir.path().to_path_buf(),
    };

    let before = {
        let index = provider
            .open("documents", "test:bag-of-words")
            .await
            .unwrap();
        let rag = pipeline(index, BagOfWordsEmbedder::new(), generator(Vec::new()));
        ingest_ml(&rag, "1").await;
        rag.retrieve("What is supervised learning?", 5).await
    };
    assert!(!before.is_empty());

    let index = provider
        .open("documents", "test:bag-of-words")
        .await
        .unwrap();
    let rag = pipeline(index, BagOfWordsEmbedder::new(), generator(Vec::new()));
    let after = rag.retrieve("What is supervised learning?", 5).await;

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_index_rejects_a_different_embedding_provider() {
    let dir = TempDir::new().unwrap();
    let provider = VectorIndexProvider::Disk {
        path: dir.path().to_path_buf(),
    };
    {
        let index = provider
            .open("documents", "test:bag-of-words")
            .await
            .unwrap();
        let rag = pipeline(index, BagOfWordsEmbedder::new(), generator(Vec::new()));
        ingest_ml(&rag, "1").await;
    }

    let reopened = provider.open("documents", "ollama:nomic-embed-text").await;
    assert!(matches!(reopened, Err(AppError::Configuration(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingest_and_answer() {
    let dir = TempDir::new().unwrap();
    let index = VectorIndexProvider::Disk {
        path: dir.path().to_path_buf(),
    }
    .open("documents", "test:bag-of-words")
    .await
    .unwrap();
    let local: Arc<dyn LLMClient> = MockLLMClient::new("llama3", "ok");
    let rag = Arc::new(pipeline(index.clone(), BagOfWordsEmbedder::new(), generator(vec![local])));

    let mut handles = Vec::new();
    for i in 0..8 {
        let rag = rag.clone();
        handles.push(tokio::spawn(async move {
            let doc_id = format!("doc{}", i);
            rag.ingest(
                &doc_id,
                &ml_document(),
                DocumentMetadata::new(&doc_id, format!("ml_{}.txt", i)),
            )
            .await
            .unwrap();
            rag.answer("What is supervised learning?", ModelChoice::Local)
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(!result.answer.is_empty());
    }

    let per_doc = index.count_by_doc("doc0").await.unwrap();
    assert!(per_doc >= 2);
    assert_eq!(index.count().await.unwrap(), per_doc * 8);
}
