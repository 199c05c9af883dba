// Deployment diagnostics: configured credentials and database reachability

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::models::AppState;

const REQUIRED_TABLES: &[&str] = &["users", "conversations", "messages", "tasks"];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/check-env", get(check_env))
        .route("/api/debug", get(debug_connection))
        .with_state(state)
}

/// First 8 characters followed by `...`, or `NOT SET`.
pub fn preview(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("{}...", v.chars().take(8).collect::<String>()),
        None => "NOT SET".to_string(),
    }
}

pub fn config_issues(config: &Config) -> Vec<String> {
    let mut issues = Vec::new();
    if !config.google_ai.has_api_key() {
        issues.push("Missing GOOGLE_AI_API_KEY: search and backfill are unavailable".to_string());
    }
    if config.search.ai_enhancement && !config.google_ai.has_api_key() {
        issues.push("SEARCH_AI_ENHANCEMENT is on but has no credential; results are returned unranked".to_string());
    }
    if config.server.cors_allowed_origins.is_empty() {
        issues.push("ALLOWED_ORIGINS is empty; browsers will be refused".to_string());
    }
    if config.search.embed_batch_size == 0 {
        issues.push("EMBED_BATCH_SIZE is 0; batches of one will be used".to_string());
    }
    issues
}

async fn check_env(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "message": "Environment variables check",
        "environment": {
            "hasDatabaseUrl": !config.database.url.is_empty(),
            "databaseUrlPreview": preview(Some(&config.database.url)),
            "hasGoogleAiKey": config.google_ai.has_api_key(),
            "googleAiKeyPreview": preview(config.google_ai.api_key.as_deref()),
            "embeddingModel": config.google_ai.embedding_model,
            "generationModel": config.google_ai.generation_model,
            "aiEnhancement": config.search.ai_enhancement,
            "allowedOrigins": config.server.cors_allowed_origins,
        },
        "issues": config_issues(config),
    }))
}

async fn debug_connection(State(state): State<AppState>) -> Response {
    let connection = match db::health_check(&state.pool).await {
        Ok(_) => json!({ "canConnect": true, "error": null, "message": "Database connected successfully" }),
        Err(e) => {
            warn!(error = %e, "Debug connection test failed");
            json!({ "canConnect": false, "error": e.to_string(), "message": "Database connection failed" })
        }
    };
    let connected = connection["canConnect"].as_bool().unwrap_or(false);

    let mut tables = Map::new();
    let mut all_tables = connected;
    if connected {
        for table in REQUIRED_TABLES {
            let entry = match db::table_exists(&state.pool, table).await {
                Ok(exists) => {
                    all_tables &= exists;
                    json!({ "exists": exists, "error": null })
                }
                Err(e) => {
                    all_tables = false;
                    json!({ "exists": false, "error": e.to_string() })
                }
            };
            tables.insert(table.to_string(), entry);
        }
    }

    let passed = connected && all_tables;
    info!(passed, "Debug checks completed");

    let status = if passed { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
    let body = json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "tests": {
            "connection": connection,
            "tables": tables,
        },
        "summary": {
            "allTestsPassed": passed,
            "message": if passed {
                "Backend is properly connected to the database"
            } else {
                "Check the individual test results for details"
            },
        },
    });

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{self, json_body, send, MemoryStore};

    #[test]
    fn test_preview() {
        assert_eq!(preview(Some("AIzaSyD-1234567890")), "AIzaSyD-...");
        assert_eq!(preview(Some("abc")), "abc...");
        assert_eq!(preview(None), "NOT SET");
    }

    #[test]
    fn test_issues_for_missing_key() {
        let mut config = test_support::config();
        assert!(config_issues(&config).is_empty());

        config.google_ai.api_key = None;
        let issues = config_issues(&config);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("GOOGLE_AI_API_KEY"));
    }

    #[tokio::test]
    async fn test_check_env_masks_key() {
        let response = send(
            test_support::state(MemoryStore::default(), None),
            test_support::get("/api/check-env"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["environment"]["googleAiKeyPreview"], "abcdefgh...");
        assert_eq!(body["environment"]["hasGoogleAiKey"], true);
        assert!(!body.to_string().contains("abcdefghijklmnop"));
    }

    #[tokio::test]
    async fn test_debug_fails_without_database() {
        let response = send(
            test_support::state(MemoryStore::default(), None),
            test_support::get("/api/debug"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["tests"]["connection"]["canConnect"], false);
        assert_eq!(body["summary"]["allTestsPassed"], false);
    }
}
