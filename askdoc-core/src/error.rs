use thiserror::Error;
use uuid::Uuid;

use crate::chunker::ChunkingError;
use crate::embeddings::EmbeddingError;
use crate::extract::ExtractionError;
use crate::generation::GenerationError;
use crate::index::IndexError;

/// Service-wide error taxonomy. Every failure a caller can observe maps to
/// exactly one variant; nothing is collapsed into a generic empty result.
#[derive(Error, Debug)]
pub enum AskdocError {
    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Document {0} contains no extractable text")]
    EmptyDocument(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Answer generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Chunking(#[from] ChunkingError),

    #[error("No index exists for document {0}")]
    NotFound(Uuid),

    #[error("Vector index error: {0}")]
    Index(IndexError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IndexError> for AskdocError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::NotFound(id) => AskdocError::NotFound(id),
            other => AskdocError::Index(other),
        }
    }
}

impl AskdocError {
    /// True for failures caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AskdocError::Extraction(_)
                | AskdocError::EmptyDocument(_)
                | AskdocError::Chunking(_)
        )
    }
}
