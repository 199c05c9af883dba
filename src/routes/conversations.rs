use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use tracing::info;
use validator::Validate;

use super::{invalid, list, message, required, single, with_data};
use crate::db::DatabaseOperations;
use crate::models::{
    AppState, ConversationFilter, CreateConversationDto, IdQuery, UpdateConversationDto,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/conversations",
            get(get_conversations)
                .post(create_conversation)
                .put(update_conversation)
                .delete(delete_conversation),
        )
        .with_state(state)
}

async fn get_conversations(
    State(state): State<AppState>,
    Query(filter): Query<ConversationFilter>,
) -> Response {
    if let Some(id) = filter.id {
        return match DatabaseOperations::get_conversation(&state.pool, id).await {
            Ok(Some(conversation)) => single(conversation),
            Ok(None) => message(StatusCode::NOT_FOUND, "Conversation not found"),
            Err(e) => e.respond("Error fetching conversation"),
        };
    }

    match DatabaseOperations::list_conversations(&state.pool, &filter).await {
        Ok(conversations) => list(conversations),
        Err(e) => e.respond("Error fetching conversations"),
    }
}

async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<CreateConversationDto>,
) -> Response {
    let (Some(name), Some(kind)) = (required(&body.name), required(&body.kind)) else {
        return message(
            StatusCode::BAD_REQUEST,
            "Missing required fields: name and type are required",
        );
    };
    if let Err(errors) = body.validate() {
        return invalid(&errors);
    }

    match DatabaseOperations::create_conversation(&state.pool, name, kind, body.avatar_url.as_deref())
        .await
    {
        Ok(conversation) => {
            info!(conversation_id = %conversation.id, kind = %conversation.kind, "Conversation created");
            with_data(StatusCode::CREATED, "Conversation created successfully", conversation)
        }
        Err(e) => e.respond("Error creating conversation"),
    }
}

async fn update_conversation(
    State(state): State<AppState>,
    Json(body): Json<UpdateConversationDto>,
) -> Response {
    let Some(id) = body.id else {
        return message(StatusCode::BAD_REQUEST, "Conversation id is required");
    };
    if let Err(errors) = body.validate() {
        return invalid(&errors);
    }

    match DatabaseOperations::update_conversation(&state.pool, id, &body).await {
        Ok(Some(conversation)) => {
            with_data(StatusCode::OK, "Conversation updated successfully", conversation)
        }
        Ok(None) => message(StatusCode::NOT_FOUND, "Conversation not found"),
        Err(e) => e.respond("Error updating conversation"),
    }
}

async fn delete_conversation(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Response {
    let Some(id) = query.id else {
        return message(
            StatusCode::BAD_REQUEST,
            "Conversation id is required as query parameter",
        );
    };

    match DatabaseOperations::delete_conversation(&state.pool, id).await {
        Ok(0) => message(StatusCode::NOT_FOUND, "Conversation not found"),
        Ok(_) => message(StatusCode::OK, "Conversation deleted successfully"),
        Err(e) => e.respond("Error deleting conversation"),
    }
}
