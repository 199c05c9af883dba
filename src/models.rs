use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::config::Config;
use crate::db::MessageStore;
use crate::embeddings::Embedder;
use crate::search::ResultEnhancer;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub store: Arc<dyn MessageStore>,
    /// `None` when no embedding credential is configured.
    pub embedder: Option<Arc<dyn Embedder>>,
    pub enhancer: Arc<ResultEnhancer>,
}

// Search pipeline records

/// A stored message as seen by the search pipeline. Read-only here.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub embedding: Option<Vec<f32>>,
}

/// A candidate projected for output, with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScoredResult {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub similarity: f64,
}

impl ScoredResult {
    pub fn from_candidate(candidate: &Candidate, similarity: f64) -> Self {
        Self {
            id: candidate.id,
            conversation_id: candidate.conversation_id,
            author_id: candidate.author_id,
            content: candidate.content.clone(),
            created_at: candidate.created_at,
            similarity,
        }
    }
}

// Core entities
// Note: FromRow is needed for runtime query_as (without DATABASE_URL at compile time)

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String, // "channel" or "person"
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A chat message. The embedding column is never selected into this type.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub is_ai: bool,
    pub task_proposal: Option<serde_json::Value>,
    pub search_result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub message_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub action: String, // "create", "update" or "comment"
    pub summary: String,
    pub details: Option<String>,
    pub status: String, // "pending", "confirmed" or "rejected"
    pub proposed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

pub const CONVERSATION_TYPES: &[&str] = &["channel", "person"];
pub const TASK_ACTIONS: &[&str] = &["create", "update", "comment"];
pub const TASK_STATUSES: &[&str] = &["pending", "confirmed", "rejected"];

fn one_of(value: &str, allowed: &[&str], code: &'static str) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        let mut err = ValidationError::new(code);
        err.message = Some(format!("must be one of: {}", allowed.join(", ")).into());
        Err(err)
    }
}

fn validate_conversation_type(value: &str) -> Result<(), ValidationError> {
    one_of(value, CONVERSATION_TYPES, "conversation_type")
}

fn validate_task_action(value: &str) -> Result<(), ValidationError> {
    one_of(value, TASK_ACTIONS, "task_action")
}

fn validate_task_status(value: &str) -> Result<(), ValidationError> {
    one_of(value, TASK_STATUSES, "task_status")
}

// API Request/Response types

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserDto {
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserDto {
    pub id: Option<Uuid>,
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConversationDto {
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_conversation_type"))]
    pub kind: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConversationDto {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_conversation_type"))]
    pub kind: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageDto {
    pub conversation_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub content: Option<String>,
    pub is_ai: Option<bool>,
    pub task_proposal: Option<serde_json::Value>,
    pub search_result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMessageDto {
    pub id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub content: Option<String>,
    pub is_ai: Option<bool>,
    pub task_proposal: Option<serde_json::Value>,
    pub search_result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskDto {
    pub message_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    #[validate(custom(function = "validate_task_action"))]
    pub action: Option<String>,
    pub summary: Option<String>,
    pub details: Option<String>,
    #[validate(custom(function = "validate_task_status"))]
    pub status: Option<String>,
    pub proposed_by: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskDto {
    pub id: Option<Uuid>,
    pub message_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    #[validate(custom(function = "validate_task_action"))]
    pub action: Option<String>,
    pub summary: Option<String>,
    pub details: Option<String>,
    #[validate(custom(function = "validate_task_status"))]
    pub status: Option<String>,
    pub proposed_by: Option<Uuid>,
}

// Query-string filters

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationFilter {
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageFilter {
    pub id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskFilter {
    pub id: Option<Uuid>,
    pub status: Option<String>,
    pub proposed_by: Option<Uuid>,
    pub message_id: Option<Uuid>,
}

// Search

#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    /// Kept loosely typed so a non-string query is reported like a missing one.
    pub query: Option<serde_json::Value>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    #[validate(range(min = 0.0, max = 1.0, message = "threshold must be between 0 and 1"))]
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ScoredResult>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// Backfill

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BackfillRequest {
    pub batch_size: Option<usize>,
    /// Zero means no limit.
    #[validate(range(min = 0, message = "must not be negative"))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub message: String,
    pub processed: usize,
    pub errors: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillStats {
    pub without_embeddings: i64,
    pub total: i64,
    pub with_embeddings: i64,
}

/// A stored message that still needs an embedding.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingMessage {
    pub id: Uuid,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_result_omits_missing_timestamp() {
        let result = ScoredResult {
            id: Uuid::nil(),
            conversation_id: Uuid::nil(),
            author_id: Uuid::nil(),
            content: "hi".to_string(),
            created_at: None,
            similarity: 0.5,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("created_at").is_none());
        assert!(json.get("embedding").is_none());
        assert_eq!(json["similarity"], 0.5);
    }

    #[test]
    fn test_search_request_ranges() {
        let ok: SearchRequest =
            serde_json::from_value(serde_json::json!({ "query": "x", "limit": 100, "threshold": 0.0 }))
                .unwrap();
        assert!(ok.validate().is_ok());

        let bad_limit: SearchRequest =
            serde_json::from_value(serde_json::json!({ "query": "x", "limit": 0 })).unwrap();
        assert!(bad_limit.validate().is_err());

        let bad_threshold: SearchRequest =
            serde_json::from_value(serde_json::json!({ "query": "x", "threshold": 1.5 })).unwrap();
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn test_backfill_wire_names() {
        let request: BackfillRequest =
            serde_json::from_value(serde_json::json!({ "batchSize": 5, "limit": 20 })).unwrap();
        assert_eq!(request.batch_size, Some(5));
        assert_eq!(request.limit, Some(20));
        assert!(request.validate().is_ok());

        let negative: BackfillRequest =
            serde_json::from_value(serde_json::json!({ "limit": -3 })).unwrap();
        assert!(negative.validate().is_err());

        let report = BackfillReport {
            message: "Backfill completed".to_string(),
            processed: 1,
            errors: 0,
            total: 1,
            error_details: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("errorDetails").is_none());

        let stats = BackfillStats { without_embeddings: 2, total: 5, with_embeddings: 3 };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["withoutEmbeddings"], 2);
        assert_eq!(json["withEmbeddings"], 3);
    }

    #[test]
    fn test_enum_like_fields_are_validated() {
        let conv: CreateConversationDto =
            serde_json::from_value(serde_json::json!({ "name": "General", "type": "group" })).unwrap();
        assert!(conv.validate().is_err());

        let task: CreateTaskDto = serde_json::from_value(serde_json::json!({
            "action": "create",
            "summary": "Ship it",
            "status": "confirmed",
            "proposed_by": Uuid::nil(),
        }))
        .unwrap();
        assert!(task.validate().is_ok());
    }
}
