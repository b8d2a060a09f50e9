//! askdoc HTTP REST API
//!
//! Axum server exposing the retrieval pipeline. Each endpoint has a thin
//! axum handler delegating to an inner function that is directly testable
//! without axum dispatch machinery.
//!
//! Endpoints:
//! - GET    /health              : health check with DB status
//! - GET    /version             : server version info
//! - POST   /upload_pdf          : multipart upload, chunk + embed + index
//! - POST   /ask_question        : retrieve context and answer
//! - GET    /get_uploaded_pdfs   : list registered documents
//! - GET    /get_conversation    : per-document Q/A history
//! - DELETE /delete_pdf/:pdf_id  : remove a document (history cascades)

use std::sync::Arc;

use anyhow::Result;
use askdoc_core::error::AskdocError;
use askdoc_core::index::VectorStore;
use askdoc_core::{
    conversation, registry, AnswerBackend, AskdocConfig, EmbeddingBackend, TextExtractor,
};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::subsystems::{answer, ingest};

/// Shared state for all HTTP handlers
pub struct AppState {
    pub pool: SqlitePool,
    pub config: AskdocConfig,
    pub store: VectorStore,
    pub extractor: Box<dyn TextExtractor>,
    pub embedder: Box<dyn EmbeddingBackend>,
    pub generator: Box<dyn AnswerBackend>,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/upload_pdf", post(upload_handler))
        .route("/ask_question", post(ask_handler))
        .route("/get_uploaded_pdfs", get(list_handler))
        .route("/get_conversation", get(conversation_handler))
        .route("/delete_pdf/:pdf_id", delete(delete_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.service.host, state.config.service.port
    );

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("askdoc HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub pdf_id: Uuid,
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub pdf_id: Uuid,
}

/// Map a pipeline failure to (status, json error body). The taxonomy stays
/// inspectable over the wire instead of collapsing into a bare 500.
fn error_response(e: &AskdocError) -> (StatusCode, serde_json::Value) {
    let status = match e {
        AskdocError::NotFound(_) => StatusCode::NOT_FOUND,
        _ if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        serde_json::json!({
            "error": e.to_string(),
            "status": "error",
        }),
    )
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check: queries DB and returns (status_code, json_body).
pub async fn health_inner(pool: &SqlitePool) -> (StatusCode, serde_json::Value) {
    match askdoc_core::db::health_check(pool).await {
        Ok(version) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "sqlite": version,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "askdoc/1",
    })
}

/// Inner upload: runs the full ingest pipeline for one file.
pub async fn upload_inner(
    state: &AppState,
    file_bytes: &[u8],
    filename: &str,
) -> (StatusCode, serde_json::Value) {
    match ingest::ingest_document(
        &state.pool,
        &state.store,
        state.extractor.as_ref(),
        state.embedder.as_ref(),
        &state.config.chunking,
        file_bytes,
        filename,
    )
    .await
    {
        Ok(document) => (
            StatusCode::OK,
            serde_json::json!({
                "pdf_id": document.id,
                "message": "File uploaded and text processed into chunks and embeddings",
            }),
        ),
        Err(e) => error_response(&e),
    }
}

/// Inner ask: retrieval plus generation plus conversation append.
pub async fn ask_inner(state: &AppState, req: AskRequest) -> (StatusCode, serde_json::Value) {
    let question = req.question.trim();
    if question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": "question field is required",
                "status": "error",
            }),
        );
    }

    match answer::answer_question(
        &state.pool,
        &state.store,
        state.embedder.as_ref(),
        state.generator.as_ref(),
        &state.config.retrieval,
        req.pdf_id,
        question,
    )
    .await
    {
        Ok(answer_text) => (StatusCode::OK, serde_json::json!({ "answer": answer_text })),
        Err(e) => error_response(&e),
    }
}

/// Inner list: all registered documents in stable order.
pub async fn list_inner(pool: &SqlitePool) -> (StatusCode, serde_json::Value) {
    match registry::list(pool).await {
        Ok(documents) => {
            let pdfs: Vec<serde_json::Value> = documents
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "pdf_id": d.id,
                        "filename": d.filename,
                        "upload_date": d.upload_date,
                    })
                })
                .collect();
            (StatusCode::OK, serde_json::json!({ "pdfs": pdfs }))
        }
        Err(e) => error_response(&AskdocError::Storage(e)),
    }
}

/// Inner conversation: history for one document. The log itself treats
/// unknown ids as empty history; the 404 for unknown documents lives here.
pub async fn conversation_inner(
    pool: &SqlitePool,
    pdf_id: Uuid,
) -> (StatusCode, serde_json::Value) {
    match registry::exists(pool, pdf_id).await {
        Ok(false) => return error_response(&AskdocError::NotFound(pdf_id)),
        Ok(true) => {}
        Err(e) => return error_response(&AskdocError::Storage(e)),
    }

    match conversation::history(pool, pdf_id).await {
        Ok(entries) => {
            let conversation: Vec<serde_json::Value> = entries
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "question": e.question,
                        "answer": e.answer,
                        "timestamp": e.timestamp,
                    })
                })
                .collect();
            (
                StatusCode::OK,
                serde_json::json!({ "conversation": conversation }),
            )
        }
        Err(e) => error_response(&AskdocError::Storage(e)),
    }
}

/// Inner delete: removes the registry row (history cascades) and the
/// cached index.
pub async fn delete_inner(state: &AppState, pdf_id: Uuid) -> (StatusCode, serde_json::Value) {
    match ingest::remove_document(&state.pool, &state.store, pdf_id).await {
        Ok(()) => (
            StatusCode::OK,
            serde_json::json!({ "pdf_id": pdf_id, "deleted": true }),
        ),
        Err(e) => error_response(&e),
    }
}

// ============================================================================
// Axum handler wrappers (thin: delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .unwrap_or("untitled")
            .to_string();
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "error": format!("failed to read upload: {e}"),
                        "status": "error",
                    })),
                );
            }
        };
        let (status, body) = upload_inner(&state, &bytes, &filename).await;
        return (status, Json(body));
    }

    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "multipart field 'file' is required",
            "status": "error",
        })),
    )
}

pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    let (status, body) = ask_inner(&state, req).await;
    (status, Json(body))
}

pub async fn list_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = list_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn conversation_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversationQuery>,
) -> impl IntoResponse {
    let (status, body) = conversation_inner(&state.pool, query.pdf_id).await;
    (status, Json(body))
}

pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(pdf_id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = delete_inner(&state, pdf_id).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests: inner functions called directly
// ============================================================================
