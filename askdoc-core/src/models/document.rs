use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered document. Created once on upload, never mutated; deleted
/// only by explicit removal, which cascades to its conversation entries.
/// The id is the join key across the registry, the conversation log, and
/// the in-memory vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
}
