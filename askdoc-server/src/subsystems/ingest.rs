//! Ingest orchestration: upload to queryable index.
//!
//! Drives the per-document pipeline: extract text, fast-fail on empty
//! documents, chunk, embed every chunk, build the vector index, register
//! the document, and only then publish the index to the shared store.
//!
//! Ordering is the contract: the registry row is written only after the
//! index is fully built, and the index becomes visible only after the row
//! exists. A failure at any step therefore leaves neither a registry entry
//! nor an index: `list_documents` never shows a document that cannot
//! answer questions, and a concurrent `answer` sees `NotFound` until the
//! publish step completes.

use askdoc_core::chunker;
use askdoc_core::config::ChunkingConfig;
use askdoc_core::error::AskdocError;
use askdoc_core::index::{DocumentIndex, VectorStore};
use askdoc_core::models::Document;
use askdoc_core::registry;
use askdoc_core::{EmbeddingBackend, TextExtractor};
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn ingest_document(
    pool: &SqlitePool,
    store: &VectorStore,
    extractor: &dyn TextExtractor,
    embedder: &dyn EmbeddingBackend,
    chunking: &ChunkingConfig,
    file_bytes: &[u8],
    filename: &str,
) -> Result<Document, AskdocError> {
    let text = extractor.extract(file_bytes)?;
    if text.trim().is_empty() {
        return Err(AskdocError::EmptyDocument(filename.to_string()));
    }

    let chunks = chunker::split(&text, chunking.size, chunking.overlap)?;
    tracing::info!(
        filename = %filename,
        chars = text.chars().count(),
        chunks = chunks.len(),
        "Chunked document"
    );

    let document_id = Uuid::new_v4();
    let mut embedded = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let vector = embedder.embed(&chunk).await?;
        embedded.push((chunk, vector));
    }

    let index = DocumentIndex::build(document_id, embedded)?;

    // Durable row first, publish second: an index is only ever visible for
    // a registered document.
    let document = registry::register_with_id(pool, document_id, filename).await?;
    store.install(index).await;

    tracing::info!(document_id = %document.id, backend = embedder.name(), "Document indexed");
    Ok(document)
}

/// Remove a document: durable row first (conversations cascade), then the
/// cached index.
pub async fn remove_document(
    pool: &SqlitePool,
    store: &VectorStore,
    document_id: Uuid,
) -> Result<(), AskdocError> {
    let removed = registry::remove(pool, document_id).await?;
    if !removed {
        return Err(AskdocError::NotFound(document_id));
    }
    store.remove(document_id).await;
    tracing::info!(document_id = %document_id, "Removed document");
    Ok(())
}
