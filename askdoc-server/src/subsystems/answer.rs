//! Answer orchestration: question to persisted answer.
//!
//! Looks up the document's index (not-found is client-visible), embeds the
//! question, retrieves top-k context above the relevance floor, and either
//! answers through the generation backend or short-circuits with the
//! no-relevant-context sentinel. Every served answer: sentinel included : 
//! is appended to the conversation log before it is returned, so history
//! is a complete audit of what the service said.

use askdoc_core::config::RetrievalConfig;
use askdoc_core::conversation;
use askdoc_core::error::AskdocError;
use askdoc_core::index::VectorStore;
use askdoc_core::{AnswerBackend, EmbeddingBackend};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Fixed response when no chunk clears the relevance floor. Returned as a
/// success and logged for audit continuity; the generator is never called.
pub const NO_CONTEXT_ANSWER: &str = "No relevant context found for this question.";

pub async fn answer_question(
    pool: &SqlitePool,
    store: &VectorStore,
    embedder: &dyn EmbeddingBackend,
    generator: &dyn AnswerBackend,
    retrieval: &RetrievalConfig,
    document_id: Uuid,
    question: &str,
) -> Result<String, AskdocError> {
    // Index lookup first: an unknown or never-indexed document is a
    // not-found condition, never a silent empty answer.
    let index = store.get(document_id).await?;

    let query_vector = embedder.embed_query(question).await?;
    let hits = index.query(&query_vector, retrieval.top_k, retrieval.relevance_floor)?;

    if hits.is_empty() {
        tracing::info!(
            document_id = %document_id,
            floor = retrieval.relevance_floor,
            "No chunk cleared the relevance floor"
        );
        conversation::append(pool, document_id, question, NO_CONTEXT_ANSWER).await?;
        return Ok(NO_CONTEXT_ANSWER.to_string());
    }

    tracing::debug!(
        document_id = %document_id,
        hits = hits.len(),
        best_score = hits[0].score,
        "Retrieved context"
    );

    let contexts: Vec<String> = hits.into_iter().map(|h| h.text).collect();
    let answer = generator.generate(question, &contexts).await?;

    conversation::append(pool, document_id, question, &answer).await?;
    Ok(answer)
}
