use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{list, message, required, single, with_data};
use crate::db::DatabaseOperations;
use crate::models::{AppState, CreateMessageDto, IdQuery, MessageFilter, UpdateMessageDto};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/messages",
            get(get_messages)
                .post(create_message)
                .put(update_message)
                .delete(delete_message),
        )
        .with_state(state)
}

/// Embed and store `content` for message `id`. Failures are logged only; the
/// message stays searchable once a backfill picks it up.
pub(crate) async fn embed_best_effort(state: &AppState, id: Uuid, content: &str) {
    let Some(embedder) = state.embedder.as_deref() else {
        debug!(message_id = %id, "No embedding provider configured, skipping embedding");
        return;
    };

    match embedder.embed(content).await {
        Ok(vector) => {
            if let Err(e) = state.store.store_embedding(id, &vector).await {
                warn!(message_id = %id, error = %e, "Failed to store message embedding");
            }
        }
        Err(e) => warn!(message_id = %id, error = %e, "Failed to embed message"),
    }
}

async fn get_messages(State(state): State<AppState>, Query(filter): Query<MessageFilter>) -> Response {
    if let Some(id) = filter.id {
        return match DatabaseOperations::get_message(&state.pool, id).await {
            Ok(Some(msg)) => single(msg),
            Ok(None) => message(StatusCode::NOT_FOUND, "Message not found"),
            Err(e) => e.respond("Error fetching message"),
        };
    }

    match DatabaseOperations::list_messages(&state.pool, &filter).await {
        Ok(messages) => list(messages),
        Err(e) => e.respond("Error fetching messages"),
    }
}

async fn create_message(State(state): State<AppState>, Json(body): Json<CreateMessageDto>) -> Response {
    let (Some(conversation_id), Some(author_id), Some(content)) =
        (body.conversation_id, body.author_id, required(&body.content))
    else {
        return message(
            StatusCode::BAD_REQUEST,
            "Missing required fields: conversation_id, author_id, and content are required",
        );
    };

    match DatabaseOperations::create_message(&state.pool, conversation_id, author_id, content, &body).await {
        Ok(created) => {
            info!(message_id = %created.id, %conversation_id, "Message created");
            embed_best_effort(&state, created.id, &created.content).await;
            with_data(StatusCode::CREATED, "Message created successfully", created)
        }
        Err(e) => e.respond("Error creating message"),
    }
}

async fn update_message(State(state): State<AppState>, Json(body): Json<UpdateMessageDto>) -> Response {
    let Some(id) = body.id else {
        return message(StatusCode::BAD_REQUEST, "Message id is required");
    };
    if body.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return message(StatusCode::BAD_REQUEST, "Message content cannot be empty");
    }

    match DatabaseOperations::update_message(&state.pool, id, &body).await {
        Ok(Some(updated)) => {
            if body.content.is_some() {
                embed_best_effort(&state, updated.id, &updated.content).await;
            }
            with_data(StatusCode::OK, "Message updated successfully", updated)
        }
        Ok(None) => message(StatusCode::NOT_FOUND, "Message not found"),
        Err(e) => e.respond("Error updating message"),
    }
}

async fn delete_message(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let Some(id) = query.id else {
        return message(StatusCode::BAD_REQUEST, "Message id is required as query parameter");
    };

    match DatabaseOperations::delete_message(&state.pool, id).await {
        Ok(0) => message(StatusCode::NOT_FOUND, "Message not found"),
        Ok(_) => message(StatusCode::OK, "Message deleted successfully"),
        Err(e) => e.respond("Error deleting message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_requires_fields() {
        let response = send(
            state(MemoryStore::default(), None),
            post_json("/api/messages", json!({ "conversation_id": Uuid::new_v4(), "content": "hi" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(
            body["message"],
            "Missing required fields: conversation_id, author_id, and content are required"
        );
    }

    #[tokio::test]
    async fn test_best_effort_embedding_stores_vector() {
        let store = Arc::new(MemoryStore::default());
        let state = state_with(store.clone(), Some(ConstantEmbedder { fail: false }));
        let id = Uuid::new_v4();

        embed_best_effort(&state, id, "hello").await;

        assert_eq!(*store.stored.lock().unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn test_best_effort_embedding_swallows_failures() {
        let store = Arc::new(MemoryStore::default());

        let failing = state_with(store.clone(), Some(ConstantEmbedder { fail: true }));
        embed_best_effort(&failing, Uuid::new_v4(), "hello").await;

        let disabled = state_with(store.clone(), None);
        embed_best_effort(&disabled, Uuid::new_v4(), "hello").await;

        assert!(store.stored.lock().unwrap().is_empty());
    }
}
