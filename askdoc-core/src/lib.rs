pub mod chunker;
pub mod config;
pub mod conversation;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod models;
pub mod registry;

pub use config::AskdocConfig;
pub use embeddings::{EmbeddingBackend, EmbeddingError, GeminiEmbeddingClient};
pub use error::AskdocError;
pub use extract::{ExtractionError, PlainTextExtractor, TextExtractor};
pub use generation::{AnswerBackend, GeminiChatClient, GenerationError};
pub use index::{DocumentIndex, IndexError, RetrievedChunk, VectorStore};
