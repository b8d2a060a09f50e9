//! Durable document registry.
//!
//! The catalog of document identity and metadata. Rows are immutable once
//! written; removal cascades to the document's conversation entries via the
//! schema's foreign key.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::Document;

/// Insert a new document with a fresh id and the current time. Storage
/// failures surface as `sqlx::Error`: never swallowed.
pub async fn register(pool: &SqlitePool, filename: &str) -> Result<Document, sqlx::Error> {
    register_with_id(pool, Uuid::new_v4(), filename).await
}

/// Insert under a caller-chosen id. The ingest pipeline builds the vector
/// index under the document's id before the registry row exists, so the id
/// has to be fixed up front.
pub async fn register_with_id(
    pool: &SqlitePool,
    document_id: Uuid,
    filename: &str,
) -> Result<Document, sqlx::Error> {
    let document = Document {
        id: document_id,
        filename: filename.to_string(),
        upload_date: Utc::now(),
    };

    sqlx::query("INSERT INTO documents (id, filename, upload_date) VALUES (?, ?, ?)")
        .bind(document.id.to_string())
        .bind(&document.filename)
        .bind(document.upload_date)
        .execute(pool)
        .await?;

    tracing::info!(document_id = %document.id, filename = %document.filename, "Registered document");
    Ok(document)
}

/// All registered documents in insertion order (upload date, then id as a
/// stable tiebreak): the same order on every call.
pub async fn list(pool: &SqlitePool) -> Result<Vec<Document>, sqlx::Error> {
    let rows: Vec<(String, String, DateTime<Utc>)> =
        sqlx::query_as("SELECT id, filename, upload_date FROM documents ORDER BY upload_date, id")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(id, filename, upload_date)| {
            Some(Document {
                id: Uuid::parse_str(&id).ok()?,
                filename,
                upload_date,
            })
        })
        .collect())
}

pub async fn exists(pool: &SqlitePool, document_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM documents WHERE id = ?")
        .bind(document_id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Delete a document row. Conversations cascade via the foreign key.
/// Returns whether a row was actually removed.
pub async fn remove(pool: &SqlitePool, document_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(document_id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    // ========================================================================
    // TEST 1: register returns a fresh id and list shows the row
    // ========================================================================
    #[tokio::test]
    async fn test_register_and_list() {
        let pool = test_pool().await;
        let a = register(&pool, "first.pdf").await.unwrap();
        let b = register(&pool, "second.pdf").await.unwrap();
        assert_ne!(a.id, b.id);

        let docs = list(&pool).await.unwrap();
        assert_eq!(docs.len(), 2);
        let filenames: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert!(filenames.contains(&"first.pdf"));
        assert!(filenames.contains(&"second.pdf"));
    }

    // ========================================================================
    // TEST 2: list order is stable across calls
    // ========================================================================
    #[tokio::test]
    async fn test_list_order_stable() {
        let pool = test_pool().await;
        for i in 0..5 {
            register(&pool, &format!("doc-{i}.pdf")).await.unwrap();
        }
        let first = list(&pool).await.unwrap();
        let second = list(&pool).await.unwrap();
        let ids_a: Vec<Uuid> = first.iter().map(|d| d.id).collect();
        let ids_b: Vec<Uuid> = second.iter().map(|d| d.id).collect();
        assert_eq!(ids_a, ids_b);
    }

    // ========================================================================
    // TEST 3: exists distinguishes known from unknown ids
    // ========================================================================
    #[tokio::test]
    async fn test_exists() {
        let pool = test_pool().await;
        let doc = register(&pool, "known.pdf").await.unwrap();
        assert!(exists(&pool, doc.id).await.unwrap());
        assert!(!exists(&pool, Uuid::new_v4()).await.unwrap());
    }

    // ========================================================================
    // TEST 4: remove deletes the row and reports whether it existed
    // ========================================================================
    #[tokio::test]
    async fn test_remove() {
        let pool = test_pool().await;
        let doc = register(&pool, "gone.pdf").await.unwrap();
        assert!(remove(&pool, doc.id).await.unwrap());
        assert!(!exists(&pool, doc.id).await.unwrap());
        assert!(!remove(&pool, doc.id).await.unwrap());
    }

    // ========================================================================
    // TEST 5: removing a document cascades to its conversations
    // ========================================================================
    #[tokio::test]
    async fn test_remove_cascades_to_conversations() {
        let pool = test_pool().await;
        let doc = register(&pool, "cascade.pdf").await.unwrap();
        crate::conversation::append(&pool, doc.id, "q", "a").await.unwrap();
        assert_eq!(crate::conversation::history(&pool, doc.id).await.unwrap().len(), 1);

        remove(&pool, doc.id).await.unwrap();
        assert!(crate::conversation::history(&pool, doc.id).await.unwrap().is_empty());
    }
}
