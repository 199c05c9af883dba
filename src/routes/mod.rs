//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/health` - Health check
//! - `/api/search` - Semantic message search
//! - `/api/messages/backfill` - Embedding backfill and coverage stats
//! - `/api/users`, `/api/conversations`, `/api/messages`, `/api/tasks` - CRUD
//! - `/api/check-env`, `/api/debug` - Deployment diagnostics

pub mod backfill;
pub mod conversations;
pub mod diagnostics;
pub mod health;
pub mod messages;
pub mod search;
pub mod tasks;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;
use validator::ValidationErrors;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(health::router(state.clone()))
        .merge(search::router(state.clone()))
        .merge(backfill::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(conversations::router(state.clone()))
        .merge(messages::router(state.clone()))
        .merge(tasks::router(state.clone()))
        .merge(diagnostics::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// Response shapes shared by the CRUD handlers

pub(crate) fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

pub(crate) fn single<T: Serialize>(data: T) -> Response {
    Json(json!({ "data": data })).into_response()
}

pub(crate) fn list<T: Serialize>(data: Vec<T>) -> Response {
    let count = data.len();
    Json(json!({ "data": data, "count": count })).into_response()
}

pub(crate) fn with_data<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    (status, Json(json!({ "message": message, "data": data }))).into_response()
}

/// 400 listing every field that failed validation.
pub(crate) fn invalid(errors: &ValidationErrors) -> Response {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let detail = errs
                .iter()
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "is invalid".to_string());
            format!("{} {}", field, detail)
        })
        .collect();
    fields.sort();
    message(StatusCode::BAD_REQUEST, &format!("Invalid fields: {}", fields.join("; ")))
}

/// 400 for a body that is not JSON of the expected shape.
pub(crate) fn bad_body(rejection: JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "Invalid request body", "error": rejection.body_text() })),
    )
        .into_response()
}

/// A required text field: present and not blank.
pub(crate) fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
