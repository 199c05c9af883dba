//! Semantic message search
//!
//! Query text is embedded, ranked against stored message embeddings (inside
//! Postgres when `match_messages` exists, otherwise in process), filtered by a
//! similarity threshold and finally handed to the optional AI enhancer for
//! re-ranking and a short summary.

pub mod enhancer;
pub mod extract;
pub mod semantic;

pub use enhancer::{EnhancementOutcome, ResultEnhancer};
pub use semantic::{semantic_search, SearchOutcome, SearchQuery};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::types::AppError;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;
pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// Errors that end a search request. `Display` is the user-facing message.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search query is required and must be a non-empty string")]
    InvalidQuery,

    #[error("Failed to generate embedding for search query")]
    Embedding(#[source] AppError),

    #[error("Error searching messages")]
    Storage(#[source] AppError),
}

impl SearchError {
    pub fn status(&self) -> StatusCode {
        match self {
            SearchError::InvalidQuery => StatusCode::BAD_REQUEST,
            SearchError::Embedding(_) | SearchError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let body = match &self {
            SearchError::InvalidQuery => serde_json::json!({ "message": self.to_string() }),
            SearchError::Embedding(e) | SearchError::Storage(e) => serde_json::json!({
                "message": self.to_string(),
                "error": e.to_string(),
            }),
        };
        (self.status(), Json(body)).into_response()
    }
}
