use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One question/answer exchange. Rows are append-only and written with both
/// fields populated in a single insert; there is no externally visible
/// "question recorded, answer pending" state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: i64,
    pub document_id: Uuid,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}
