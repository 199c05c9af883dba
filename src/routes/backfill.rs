use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{error, info};
use validator::Validate;

use crate::embeddings::{run_backfill, BackfillError};
use crate::models::{AppState, BackfillRequest};
use crate::types::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/messages/backfill",
            get(embedding_stats).post(backfill_embeddings),
        )
        .with_state(state)
}

/// Embedding coverage across all stored messages.
async fn embedding_stats(State(state): State<AppState>) -> Response {
    match state.store.embedding_stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read embedding stats");
            e.respond("Error fetching statistics")
        }
    }
}

async fn backfill_embeddings(
    State(state): State<AppState>,
    body: Result<Option<Json<BackfillRequest>>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(body) => body.map(|Json(r)| r).unwrap_or_default(),
        Err(rejection) => return super::bad_body(rejection),
    };
    if let Err(errors) = request.validate() {
        return super::invalid(&errors);
    }

    let Some(embedder) = state.embedder.as_deref() else {
        return AppError::Config("GOOGLE_AI_API_KEY is not set".to_string())
            .respond("Failed to generate embeddings");
    };

    let batch_size = request
        .batch_size
        .unwrap_or(state.config.search.embed_batch_size);

    info!(batch_size, limit = ?request.limit, "Starting embedding backfill");

    match run_backfill(state.store.as_ref(), embedder, batch_size, request.limit).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            let status = match e {
                BackfillError::Fetch(ref inner) => inner.status(),
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(json!({ "message": e.to_string(), "error": e.detail() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{BackfillStats, PendingMessage};
    use crate::routes::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    fn pending(content: &str) -> PendingMessage {
        PendingMessage {
            id: Uuid::new_v4(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryStore {
            stats: Some(BackfillStats { without_embeddings: 4, total: 10, with_embeddings: 6 }),
            ..MemoryStore::default()
        };
        let response = send(state(store, None), get("/api/messages/backfill")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body, json!({ "withoutEmbeddings": 4, "total": 10, "withEmbeddings": 6 }));
    }

    #[tokio::test]
    async fn test_backfill_processes_pending_messages() {
        let store = MemoryStore {
            pending: vec![pending("hello"), pending("  "), pending("world")],
            ..MemoryStore::default()
        };
        let state = state(store, Some(ConstantEmbedder { fail: false }));

        let response = send(state, post_json("/api/messages/backfill", json!({ "batchSize": 1 }))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Backfill completed");
        assert_eq!(body["processed"], 2);
        assert_eq!(body["errors"], 0);
        assert_eq!(body["total"], 3);
        assert!(body.get("errorDetails").is_none());
    }

    #[tokio::test]
    async fn test_backfill_with_nothing_pending() {
        let state = state(MemoryStore::default(), Some(ConstantEmbedder { fail: false }));
        let response = send(state, post_json("/api/messages/backfill", json!({}))).await;

        let body = json_body(response).await;
        assert_eq!(body["message"], "No messages found without embeddings");
        assert_eq!(body["processed"], 0);
    }

    #[tokio::test]
    async fn test_backfill_embedding_failure() {
        let store = MemoryStore {
            pending: vec![pending("hello")],
            ..MemoryStore::default()
        };
        let state = state(store, Some(ConstantEmbedder { fail: true }));

        let response = send(state, post_json("/api/messages/backfill", json!({}))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Failed to generate embeddings");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_backfill_rejects_negative_limit() {
        let store = MemoryStore {
            pending: vec![pending("hello")],
            ..MemoryStore::default()
        };
        let state = state(store, Some(ConstantEmbedder { fail: false }));

        let response = send(state, post_json("/api/messages/backfill", json!({ "limit": -1 }))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["message"].as_str().unwrap().contains("limit"));
    }

    #[tokio::test]
    async fn test_backfill_rejects_malformed_body() {
        let state = state(MemoryStore::default(), Some(ConstantEmbedder { fail: false }));
        let response = send(
            state,
            post_json("/api/messages/backfill", json!({ "batchSize": "many" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Invalid request body");
    }

    #[tokio::test]
    async fn test_backfill_without_body_uses_defaults() {
        let store = MemoryStore {
            pending: vec![pending("hello")],
            ..MemoryStore::default()
        };
        let state = state(store, Some(ConstantEmbedder { fail: false }));
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/messages/backfill")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = send(state, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["processed"], 1);
    }

    #[tokio::test]
    async fn test_backfill_without_credentials() {
        let response = send(
            state(MemoryStore::default(), None),
            post_json("/api/messages/backfill", json!({})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
