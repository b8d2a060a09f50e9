//! End-to-end retrieval pipeline tests: ingest → index → ask → history,
//! hermetic against an in-memory SQLite database, with deterministic stub
//! backends (plus one path through the real Gemini clients against a
//! wiremock server).

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use askdoc_core::config::{ChunkingConfig, RetrievalConfig};
use askdoc_core::error::AskdocError;
use askdoc_core::index::VectorStore;
use askdoc_core::{
    conversation, registry, AnswerBackend, EmbeddingBackend, EmbeddingError, GenerationError,
    PlainTextExtractor,
};
use askdoc_server::subsystems::{answer, ingest};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::from_str("sqlite::memory:")
                .expect("memory dsn")
                .foreign_keys(true),
        )
        .await
        .expect("in-memory sqlite");
    askdoc_core::db::init_schema(&pool).await.expect("schema init");
    pool
}

/// Deterministic embedder: document text maps to x-axis, anything with a
/// question mark maps to y-axis. Similarity between the two is exactly 0,
/// which sits below any positive relevance floor.
struct StubEmbedder;

#[async_trait]
impl EmbeddingBackend for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains('?') {
            Ok(vec![0.0, 1.0, 0.0])
        } else {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Embedder that puts every text on the same axis, so any question clears
/// the relevance floor against any chunk.
struct AlignedEmbedder;

#[async_trait]
impl EmbeddingBackend for AlignedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "aligned"
    }
}

/// Canned generator that counts invocations.
struct CountingGenerator {
    calls: Arc<AtomicUsize>,
    reply: String,
}

impl CountingGenerator {
    fn new(reply: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                reply: reply.to_string(),
            },
            calls,
        )
    }
}

#[async_trait]
impl AnswerBackend for CountingGenerator {
    async fn generate(
        &self,
        _question: &str,
        _contexts: &[String],
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

// ============================================================================
// TEST 1: 50k-char document produces exactly 6 chunks, all indexed
// ============================================================================
#[tokio::test]
async fn test_ingest_fifty_thousand_chars_six_chunks() {
    let pool = test_pool().await;
    let store = VectorStore::new();
    let text = "A".repeat(50_000);

    let document = ingest::ingest_document(
        &pool,
        &store,
        &PlainTextExtractor,
        &StubEmbedder,
        &ChunkingConfig::default(),
        text.as_bytes(),
        "big.txt",
    )
    .await
    .expect("ingest failed");

    assert!(registry::exists(&pool, document.id).await.unwrap());
    let index = store.get(document.id).await.expect("index must be published");
    assert_eq!(index.len(), 6);
    assert_eq!(index.dimensions(), 3);
}

// ============================================================================
// TEST 2: below-floor question returns the sentinel, logs it, and never
// calls the generator
// ============================================================================
#[tokio::test]
async fn test_below_floor_question_returns_logged_sentinel() {
    let pool = test_pool().await;
    let store = VectorStore::new();
    let (generator, calls) = CountingGenerator::new("unreachable");

    let document = ingest::ingest_document(
        &pool,
        &store,
        &PlainTextExtractor,
        &StubEmbedder,
        &ChunkingConfig::default(),
        "A".repeat(50_000).as_bytes(),
        "big.txt",
    )
    .await
    .unwrap();

    let retrieval = RetrievalConfig::default();
    let answer_text = answer::answer_question(
        &pool,
        &store,
        &StubEmbedder,
        &generator,
        &retrieval,
        document.id,
        "irrelevant question?",
    )
    .await
    .expect("sentinel is a success, not an error");

    assert_eq!(answer_text, answer::NO_CONTEXT_ANSWER);
    assert_eq!(calls.load(Ordering::SeqCst), 0, "generator must not run");

    let history = conversation::history(&pool, document.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "irrelevant question?");
    assert_eq!(history[0].answer, answer::NO_CONTEXT_ANSWER);
}

// ============================================================================
// TEST 3: relevant question flows through the generator and is persisted
// ============================================================================
#[tokio::test]
async fn test_relevant_question_generates_and_persists() {
    let pool = test_pool().await;
    let store = VectorStore::new();
    let (generator, calls) = CountingGenerator::new("The document is about the letter A.");

    let document = ingest::ingest_document(
        &pool,
        &store,
        &PlainTextExtractor,
        &AlignedEmbedder,
        &ChunkingConfig { size: 100, overlap: 10 },
        b"A short document about the letter A.",
        "short.txt",
    )
    .await
    .unwrap();

    let retrieval = RetrievalConfig::default();
    let answer_text = answer::answer_question(
        &pool,
        &store,
        &AlignedEmbedder,
        &generator,
        &retrieval,
        document.id,
        "what is it about?",
    )
    .await
    .unwrap();

    assert_eq!(answer_text, "The document is about the letter A.");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let history = conversation::history(&pool, document.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].answer, answer_text);
}

// ============================================================================
// TEST 4: asking about a never-ingested document is NotFound, not an
// empty answer
// ============================================================================
#[tokio::test]
async fn test_ask_unknown_document_not_found() {
    let pool = test_pool().await;
    let store = VectorStore::new();
    let (generator, _calls) = CountingGenerator::new("unreachable");
    let unknown = Uuid::new_v4();

    let err = answer::answer_question(
        &pool,
        &store,
        &StubEmbedder,
        &generator,
        &RetrievalConfig::default(),
        unknown,
        "anyone home?",
    )
    .await
    .unwrap_err();

    match err {
        AskdocError::NotFound(id) => assert_eq!(id, unknown),
        other => panic!("Expected NotFound, got {other:?}"),
    }
    // Nothing was logged for the failed ask
    assert!(conversation::history(&pool, unknown).await.unwrap().is_empty());
}

// ============================================================================
// TEST 5: an empty document fails fast and leaves no state behind
// ============================================================================
#[tokio::test]
async fn test_empty_document_leaves_no_state() {
    let pool = test_pool().await;
    let store = VectorStore::new();

    let err = ingest::ingest_document(
        &pool,
        &store,
        &PlainTextExtractor,
        &StubEmbedder,
        &ChunkingConfig::default(),
        b"   \n\t  ",
        "empty.txt",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AskdocError::EmptyDocument(_)));
    assert!(registry::list(&pool).await.unwrap().is_empty());
}

// ============================================================================
// TEST 6: a failing embedder aborts ingest before any registry write
// ============================================================================
#[tokio::test]
async fn test_embedding_failure_aborts_ingest() {
    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingBackend for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::RetryExhausted { attempts: 3 })
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    let pool = test_pool().await;
    let store = VectorStore::new();

    let err = ingest::ingest_document(
        &pool,
        &store,
        &PlainTextExtractor,
        &FailingEmbedder,
        &ChunkingConfig::default(),
        b"some perfectly fine text",
        "doc.txt",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AskdocError::Embedding(_)));
    assert!(registry::list(&pool).await.unwrap().is_empty());
}

// ============================================================================
// TEST 7: concurrent ingests produce distinct, isolated documents
// ============================================================================
#[tokio::test]
async fn test_concurrent_ingests_are_isolated() {
    let pool = test_pool().await;
    let store = Arc::new(VectorStore::new());

    let pool_a = pool.clone();
    let store_a = store.clone();
    let task_a = tokio::spawn(async move {
        ingest::ingest_document(
            &pool_a,
            &store_a,
            &PlainTextExtractor,
            &AlignedEmbedder,
            &ChunkingConfig { size: 100, overlap: 10 },
            b"contents of document alpha",
            "alpha.txt",
        )
        .await
    });

    let pool_b = pool.clone();
    let store_b = store.clone();
    let task_b = tokio::spawn(async move {
        ingest::ingest_document(
            &pool_b,
            &store_b,
            &PlainTextExtractor,
            &AlignedEmbedder,
            &ChunkingConfig { size: 100, overlap: 10 },
            b"contents of document beta",
            "beta.txt",
        )
        .await
    });

    let doc_a = task_a.await.unwrap().expect("ingest alpha");
    let doc_b = task_b.await.unwrap().expect("ingest beta");
    assert_ne!(doc_a.id, doc_b.id);

    let hits_a = store.query(doc_a.id, &[1.0, 0.0], 4, 0.0).await.unwrap();
    assert_eq!(hits_a.len(), 1);
    assert!(hits_a[0].text.contains("alpha"));

    let hits_b = store.query(doc_b.id, &[1.0, 0.0], 4, 0.0).await.unwrap();
    assert_eq!(hits_b.len(), 1);
    assert!(hits_b[0].text.contains("beta"));
}

// ============================================================================
// TEST 8: full pipeline through the real Gemini clients (wiremock)
// ============================================================================
#[tokio::test]
async fn test_pipeline_through_gemini_clients() {
    use askdoc_core::embeddings::{GeminiEmbeddingConfig, GeminiEmbeddingClient};
    use askdoc_core::generation::{GeminiChatClient, GeminiChatConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;

    let values: Vec<f32> = (0..768).map(|i| ((i % 7) as f32) / 7.0).collect();
    Mock::given(method("POST"))
        .and(path("/models/embedding-001:embedContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": { "values": values }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "A generated answer." }] } }
            ]
        })))
        .mount(&mock_server)
        .await;

    let embedder = GeminiEmbeddingClient::with_base_url(
        GeminiEmbeddingConfig {
            api_key: "test-key".to_string(),
            model: "embedding-001".to_string(),
            dimensions: 768,
            max_retries: 1,
            retry_delay_ms: 10,
        },
        mock_server.uri(),
    )
    .unwrap();

    let generator = GeminiChatClient::with_base_url(
        GeminiChatConfig {
            api_key: "test-key".to_string(),
            model: "gemini-pro".to_string(),
            temperature: 0.3,
            max_retries: 1,
            retry_delay_ms: 10,
        },
        mock_server.uri(),
    )
    .unwrap();

    let pool = test_pool().await;
    let store = VectorStore::new();

    let document = ingest::ingest_document(
        &pool,
        &store,
        &PlainTextExtractor,
        &embedder,
        &ChunkingConfig { size: 500, overlap: 50 },
        b"Retrieval-augmented generation in one paragraph.",
        "rag.txt",
    )
    .await
    .expect("ingest via gemini mock");

    // Identical mock vectors give cosine 1.0: well above the floor.
    let answer_text = answer::answer_question(
        &pool,
        &store,
        &embedder,
        &generator,
        &RetrievalConfig::default(),
        document.id,
        "what is this?",
    )
    .await
    .expect("answer via gemini mock");

    assert_eq!(answer_text, "A generated answer.");
    let history = conversation::history(&pool, document.id).await.unwrap();
    assert_eq!(history.len(), 1);
}
