//! Durable conversation log.
//!
//! Append-only question/answer history per document. This component does
//! not check that a document exists: an unknown id simply has an empty
//! history; the orchestrator owns the existence check.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::ConversationEntry;

/// Append one exchange in a single atomic insert. Both fields land
/// together: readers never see a question without its answer.
pub async fn append(
    pool: &SqlitePool,
    document_id: Uuid,
    question: &str,
    answer: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO conversations (document_id, question, answer, timestamp) VALUES (?, ?, ?, ?)",
    )
    .bind(document_id.to_string())
    .bind(question)
    .bind(answer)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// A document's history, ascending by timestamp with insertion order
/// breaking ties. Unknown ids yield an empty list, not an error.
pub async fn history(
    pool: &SqlitePool,
    document_id: Uuid,
) -> Result<Vec<ConversationEntry>, sqlx::Error> {
    let rows: Vec<(i64, String, String, DateTime<Utc>)> = sqlx::query_as(
        "SELECT id, question, answer, timestamp FROM conversations \
         WHERE document_id = ? ORDER BY timestamp, id",
    )
    .bind(document_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, question, answer, timestamp)| ConversationEntry {
            id,
            document_id,
            question,
            answer,
            timestamp,
        })
        .collect())
}
