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
use crate::models::{AppState, CreateUserDto, IdQuery, UpdateUserDto, UserFilter};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/users",
            get(get_users).post(create_user).put(update_user).delete(delete_user),
        )
        .with_state(state)
}

async fn get_users(State(state): State<AppState>, Query(filter): Query<UserFilter>) -> Response {
    if let Some(id) = filter.id {
        return match DatabaseOperations::get_user(&state.pool, id).await {
            Ok(Some(user)) => single(user),
            Ok(None) => message(StatusCode::NOT_FOUND, "User not found"),
            Err(e) => e.respond("Error fetching user"),
        };
    }

    match DatabaseOperations::list_users(&state.pool, &filter).await {
        Ok(users) => list(users),
        Err(e) => e.respond("Error fetching users"),
    }
}

async fn create_user(State(state): State<AppState>, Json(body): Json<CreateUserDto>) -> Response {
    let (Some(username), Some(email), Some(display_name)) = (
        required(&body.username),
        required(&body.email),
        required(&body.display_name),
    ) else {
        return message(
            StatusCode::BAD_REQUEST,
            "Missing required fields: username, email, and display_name are required",
        );
    };
    if let Err(errors) = body.validate() {
        return invalid(&errors);
    }

    match DatabaseOperations::create_user(
        &state.pool,
        username,
        email,
        display_name,
        body.avatar_url.as_deref(),
    )
    .await
    {
        Ok(user) => {
            info!(user_id = %user.id, "User created");
            with_data(StatusCode::CREATED, "User created successfully", user)
        }
        Err(e) => e.respond("Error creating user"),
    }
}

async fn update_user(State(state): State<AppState>, Json(body): Json<UpdateUserDto>) -> Response {
    let Some(id) = body.id else {
        return message(StatusCode::BAD_REQUEST, "User id is required");
    };
    if let Err(errors) = body.validate() {
        return invalid(&errors);
    }

    match DatabaseOperations::update_user(&state.pool, id, &body).await {
        Ok(Some(user)) => with_data(StatusCode::OK, "User updated successfully", user),
        Ok(None) => message(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => e.respond("Error updating user"),
    }
}

async fn delete_user(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let Some(id) = query.id else {
        return message(StatusCode::BAD_REQUEST, "User id is required as query parameter");
    };

    match DatabaseOperations::delete_user(&state.pool, id).await {
        Ok(0) => message(StatusCode::NOT_FOUND, "User not found"),
        Ok(_) => message(StatusCode::OK, "User deleted successfully"),
        Err(e) => e.respond("Error deleting user"),
    }
}
