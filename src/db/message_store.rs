// Message storage seen from the search and backfill pipelines

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::embeddings::EmbeddingVector;
use crate::models::{BackfillStats, Candidate, PendingMessage, ScoredResult};
use crate::types::AppResult;

/// Postgres error codes meaning the vector search function or the vector
/// type is not installed.
const UNDEFINED_FUNCTION: &str = "42883";
const UNDEFINED_OBJECT: &str = "42704";

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Rank stored messages against `query` inside the database, best first.
    /// `Ok(None)` means the database has no native vector search.
    async fn fetch_candidates_by_vector(
        &self,
        query: &EmbeddingVector,
        limit: usize,
    ) -> AppResult<Option<Vec<ScoredResult>>>;

    /// Every message that has an embedding.
    async fn fetch_all_embedded_candidates(&self) -> AppResult<Vec<Candidate>>;

    /// Messages without an embedding, oldest first.
    async fn fetch_unembedded(&self, limit: Option<i64>) -> AppResult<Vec<PendingMessage>>;

    async fn store_embedding(&self, id: Uuid, embedding: &EmbeddingVector) -> AppResult<()>;

    async fn embedding_stats(&self) -> AppResult<BackfillStats>;
}

#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EmbeddedRow {
    id: Uuid,
    conversation_id: Uuid,
    author_id: Uuid,
    content: String,
    created_at: Option<DateTime<Utc>>,
    embedding: Option<String>,
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    without_embeddings: i64,
    total: i64,
}

fn is_missing_vector_support(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some(UNDEFINED_FUNCTION) | Some(UNDEFINED_OBJECT)
        ),
        _ => false,
    }
}

/// Parse a vector read back as text. Accepts the pgvector form `[1,2,3]`
/// and the array form `{1,2,3}`. Returns `None` on anything else.
pub fn parse_vector_text(raw: &str) -> Option<Vec<f32>> {
    let raw = raw.trim();
    let inner = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .or_else(|| raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')))?;

    if inner.trim().is_empty() {
        return None;
    }

    inner
        .split(',')
        .map(|part| part.trim().parse::<f32>().ok())
        .collect()
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn fetch_candidates_by_vector(
        &self,
        query: &EmbeddingVector,
        limit: usize,
    ) -> AppResult<Option<Vec<ScoredResult>>> {
        let result = sqlx::query_as::<_, ScoredResult>(
            r#"
            SELECT id, conversation_id, author_id, content, created_at, similarity::float8 AS similarity
            FROM match_messages($1::vector, $2)
            "#,
        )
        .bind(query.to_pg_literal())
        .bind(i32::try_from(limit).unwrap_or(i32::MAX))
        .fetch_all(&self.pool)
        .await;

        match result {
            Ok(rows) => {
                debug!(count = rows.len(), "Native vector search returned rows");
                Ok(Some(rows))
            }
            Err(e) if is_missing_vector_support(&e) => {
                warn!(error = %e, "Native vector search unavailable, scoring locally");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_all_embedded_candidates(&self) -> AppResult<Vec<Candidate>> {
        let rows = sqlx::query_as::<_, EmbeddedRow>(
            r#"
            SELECT id, conversation_id, author_id, content, created_at, embedding::text AS embedding
            FROM messages
            WHERE embedding IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let candidates = rows
            .into_iter()
            .map(|row| {
                let embedding = row.embedding.as_deref().and_then(parse_vector_text);
                if embedding.is_none() {
                    debug!(message_id = %row.id, "Skipping unparseable stored embedding");
                }
                Candidate {
                    id: row.id,
                    conversation_id: row.conversation_id,
                    author_id: row.author_id,
                    content: row.content,
                    created_at: row.created_at,
                    embedding,
                }
            })
            .collect();

        Ok(candidates)
    }

    async fn fetch_unembedded(&self, limit: Option<i64>) -> AppResult<Vec<PendingMessage>> {
        let messages = sqlx::query_as::<_, PendingMessage>(
            r#"
            SELECT id, content FROM messages
            WHERE embedding IS NULL
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn store_embedding(&self, id: Uuid, embedding: &EmbeddingVector) -> AppResult<()> {
        sqlx::query("UPDATE messages SET embedding = $1::vector WHERE id = $2")
            .bind(embedding.to_pg_literal())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn embedding_stats(&self) -> AppResult<BackfillStats> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE embedding IS NULL) AS without_embeddings,
                COUNT(*) AS total
            FROM messages
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(BackfillStats {
            without_embeddings: row.without_embeddings,
            total: row.total,
            with_embeddings: row.total - row.without_embeddings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector_text_forms() {
        assert_eq!(parse_vector_text("[1,2.5,-3]"), Some(vec![1.0, 2.5, -3.0]));
        assert_eq!(parse_vector_text(" {0.1, 0.2} "), Some(vec![0.1, 0.2]));
        assert_eq!(parse_vector_text("[1e-3]"), Some(vec![0.001]));
    }

    #[test]
    fn test_parse_vector_text_rejects_garbage() {
        assert_eq!(parse_vector_text(""), None);
        assert_eq!(parse_vector_text("[]"), None);
        assert_eq!(parse_vector_text("1,2,3"), None);
        assert_eq!(parse_vector_text("[1,abc]"), None);
        assert_eq!(parse_vector_text("[1,2"), None);
    }

    #[test]
    fn test_missing_vector_support_only_for_database_errors() {
        assert!(!is_missing_vector_support(&sqlx::Error::RowNotFound));
        assert!(!is_missing_vector_support(&sqlx::Error::PoolTimedOut));
    }
}
