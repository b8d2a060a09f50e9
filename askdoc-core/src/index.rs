//! Per-document in-memory vector index.
//!
//! Holds one immutable [`DocumentIndex`] per document id behind an
//! `RwLock<HashMap<Uuid, Arc<DocumentIndex>>>`. Builds happen off to the
//! side and are published with a single map insert, so a concurrent reader
//! observes either the previous fully-built index or the new one, never a
//! half-built state. Lookups on different document ids never contend beyond
//! the brief map access.
//!
//! This cache is deliberately restart-volatile: documents and conversation
//! history live in SQLite, vectors do not. Losing the process means lost
//! indexes, and recovering a document requires re-ingestion: not
//! re-registration. Callers must treat that asymmetry as part of the
//! contract.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq)]
pub enum IndexError {
    #[error("Cannot build an index from an empty chunk sequence")]
    EmptyInput,

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No index exists for document {0}")]
    NotFound(Uuid),
}

/// One chunk as stored in the index. `sequence` preserves original document
/// order for reconstruction and debugging; ranking ignores it except as a
/// deterministic tiebreak.
#[derive(Debug, Clone)]
struct IndexedChunk {
    sequence: usize,
    text: String,
    vector: Vec<f32>,
}

/// A retrieval hit: chunk text plus its cosine similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub sequence: usize,
    pub text: String,
    pub score: f32,
}

/// Immutable per-document index over (text, vector) chunk pairs.
#[derive(Debug)]
pub struct DocumentIndex {
    document_id: Uuid,
    dimensions: usize,
    chunks: Vec<IndexedChunk>,
}

impl DocumentIndex {
    /// Build an index from chunks in document order. Fails on an empty
    /// sequence or on vectors of inconsistent dimensionality.
    pub fn build(
        document_id: Uuid,
        chunks: Vec<(String, Vec<f32>)>,
    ) -> Result<Self, IndexError> {
        let mut iter = chunks.into_iter();
        let (first_text, first_vector) = iter.next().ok_or(IndexError::EmptyInput)?;
        let dimensions = first_vector.len();

        let mut indexed = vec![IndexedChunk {
            sequence: 0,
            text: first_text,
            vector: first_vector,
        }];

        for (sequence, (text, vector)) in iter.enumerate() {
            if vector.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            indexed.push(IndexedChunk {
                sequence: sequence + 1,
                text,
                vector,
            });
        }

        Ok(Self {
            document_id,
            dimensions,
            chunks: indexed,
        })
    }

    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Score every chunk against `query_vector` and return the best `k`,
    /// highest similarity first, dropping hits below `relevance_floor`.
    ///
    /// An empty result is a valid outcome ("no relevant context"), not an
    /// error. `k = 0` short-circuits to empty.
    pub fn query(
        &self,
        query_vector: &[f32],
        k: usize,
        relevance_floor: f32,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        if query_vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<RetrievedChunk> = self
            .chunks
            .iter()
            .map(|chunk| RetrievedChunk {
                sequence: chunk.sequence,
                text: chunk.text.clone(),
                score: cosine_similarity(query_vector, &chunk.vector),
            })
            .filter(|hit| hit.score >= relevance_floor)
            .collect();

        // Highest score first; equal scores keep document order.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.sequence.cmp(&b.sequence))
        });
        hits.truncate(k);

        Ok(hits)
    }
}

/// Cosine similarity over f32 slices. Zero-norm inputs score 0.0 so that an
/// all-zero vector can never rank above real content (and never produces
/// NaN).
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Shared keyed cache of document indexes.
#[derive(Debug, Default)]
pub struct VectorStore {
    inner: RwLock<HashMap<Uuid, Arc<DocumentIndex>>>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a fully-built index, replacing any prior index for the same
    /// document id. Re-indexing is a full replacement, never an additive
    /// update.
    pub async fn install(&self, index: DocumentIndex) {
        let document_id = index.document_id();
        let mut map = self.inner.write().await;
        map.insert(document_id, Arc::new(index));
    }

    /// Snapshot of the index for `document_id`, if one has been published.
    pub async fn get(&self, document_id: Uuid) -> Result<Arc<DocumentIndex>, IndexError> {
        let map = self.inner.read().await;
        map.get(&document_id)
            .cloned()
            .ok_or(IndexError::NotFound(document_id))
    }

    pub async fn contains(&self, document_id: Uuid) -> bool {
        self.inner.read().await.contains_key(&document_id)
    }

    /// Drop the cached index for a removed document. Missing entries are
    /// fine: the index may simply not have survived a restart.
    pub async fn remove(&self, document_id: Uuid) {
        self.inner.write().await.remove(&document_id);
    }

    /// Convenience: look up the document's index and run a query against it.
    pub async fn query(
        &self,
        document_id: Uuid,
        query_vector: &[f32],
        k: usize,
        relevance_floor: f32,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        let index = self.get(document_id).await?;
        index.query(query_vector, k, relevance_floor)
    }
}
