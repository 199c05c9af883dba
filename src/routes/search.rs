use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::info;
use validator::Validate;

use crate::models::{AppState, SearchRequest, SearchResponse};
use crate::search::{semantic_search, SearchQuery};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", post(search_messages))
        .with_state(state)
}

pub async fn search_messages(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return super::bad_body(rejection),
    };

    let query = match SearchQuery::from_json(
        request.query.as_ref(),
        request.limit.map(|l| l as usize),
        request.threshold,
    ) {
        Ok(query) => query,
        Err(e) => return e.into_response(),
    };

    if let Err(errors) = request.validate() {
        return super::invalid(&errors);
    }

    info!(query = %query.text, "Received search request");

    match semantic_search(
        state.store.as_ref(),
        state.embedder.as_deref(),
        &state.enhancer,
        query,
    )
    .await
    {
        Ok(outcome) => Json(SearchResponse::from(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::models::ScoredResult;
    use crate::routes::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    fn scored(content: &str, similarity: f64) -> ScoredResult {
        ScoredResult {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content: content.to_string(),
            created_at: None,
            similarity,
        }
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let state = state(MemoryStore::default(), Some(ConstantEmbedder { fail: false }));
        let response = send(state, post_json("/api/search", json!({ "query": "   " }))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Search query is required and must be a non-empty string");
    }

    #[tokio::test]
    async fn test_non_string_query_is_rejected() {
        let state = state(MemoryStore::default(), Some(ConstantEmbedder { fail: false }));
        let response = send(state, post_json("/api/search", json!({ "query": 7 }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_out_of_range_limit_is_rejected() {
        let state = state(MemoryStore::default(), Some(ConstantEmbedder { fail: false }));
        let response = send(state, post_json("/api/search", json!({ "query": "x", "limit": 500 }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mistyped_field_is_a_json_400() {
        let state = state(MemoryStore::default(), Some(ConstantEmbedder { fail: false }));
        let response = send(
            state,
            post_json("/api/search", json!({ "query": "x", "limit": "ten" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Invalid request body");
        assert!(body["error"].as_str().unwrap().contains("limit"));
    }

    #[tokio::test]
    async fn test_negative_limit_is_a_json_400() {
        let state = state(MemoryStore::default(), Some(ConstantEmbedder { fail: false }));
        let response = send(state, post_json("/api/search", json!({ "query": "x", "limit": -5 }))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Invalid request body");
    }

    #[tokio::test]
    async fn test_search_returns_matches() {
        let store = MemoryStore {
            ranked: vec![
                scored("For standard accounts, I'd suggest a $10,000 daily limit.", 0.85),
                scored("Lunch?", 0.1),
            ],
            ..MemoryStore::default()
        };
        let state = state(store, Some(ConstantEmbedder { fail: false }));

        let response = send(
            state,
            post_json("/api/search", json!({ "query": "payment limits", "threshold": 0.4 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["query"], "payment limits");
        assert_eq!(body["count"], 1);
        assert_eq!(body["results"][0]["similarity"], 0.85);
        assert!(body.get("warning").is_none());
        assert!(body.get("summary").is_none());
        assert!(body["results"][0].get("embedding").is_none());
    }

    #[tokio::test]
    async fn test_threshold_fallback_warns() {
        let store = MemoryStore {
            ranked: vec![scored("a", 0.3), scored("b", 0.2)],
            ..MemoryStore::default()
        };
        let state = state(store, Some(ConstantEmbedder { fail: false }));

        let response = send(
            state,
            post_json("/api/search", json!({ "query": "x", "threshold": 0.5 })),
        )
        .await;

        let body = json_body(response).await;
        assert_eq!(body["count"], 2);
        assert_eq!(
            body["warning"],
            "No results found with similarity >= 0.5. Showing top results."
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_is_500_with_detail() {
        let state = state(MemoryStore::default(), Some(ConstantEmbedder { fail: true }));
        let response = send(state, post_json("/api/search", json!({ "query": "x" }))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Failed to generate embedding for search query");
        assert!(body["error"].as_str().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_missing_embedder_is_500() {
        let state = state(MemoryStore::default(), None);
        let response = send(state, post_json("/api/search", json!({ "query": "x" }))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
