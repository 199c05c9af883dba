// Search orchestration: embed, rank, threshold, enhance

use tracing::{debug, info, warn};

use super::{ResultEnhancer, SearchError, DEFAULT_LIMIT, DEFAULT_THRESHOLD, MAX_LIMIT};
use crate::db::MessageStore;
use crate::embeddings::{self, Embedder};
use crate::models::{ScoredResult, SearchResponse};
use crate::types::AppError;

/// A validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub limit: usize,
    pub threshold: f64,
}

impl SearchQuery {
    /// The query text must be non-empty after trimming. The original text is
    /// kept for the response; the trimmed text is what gets embedded. `limit`
    /// is clamped to `1..=MAX_LIMIT`.
    pub fn new(text: &str, limit: Option<usize>, threshold: Option<f64>) -> Result<Self, SearchError> {
        if text.trim().is_empty() {
            return Err(SearchError::InvalidQuery);
        }
        Ok(Self {
            text: text.to_string(),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            threshold: threshold.unwrap_or(DEFAULT_THRESHOLD),
        })
    }

    /// Build from a loosely typed `query` field; anything but a string is invalid.
    pub fn from_json(
        query: Option<&serde_json::Value>,
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> Result<Self, SearchError> {
        let text = query
            .and_then(serde_json::Value::as_str)
            .ok_or(SearchError::InvalidQuery)?;
        Self::new(text, limit, threshold)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub query: String,
    pub results: Vec<ScoredResult>,
    pub summary: Option<String>,
    pub warning: Option<String>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        SearchResponse {
            query: outcome.query,
            count: outcome.results.len(),
            results: outcome.results,
            summary: outcome.summary,
            warning: outcome.warning,
        }
    }
}

/// Top `limit` results ranked by similarity, from the database when it can
/// rank natively, otherwise scored in process.
async fn ranked_candidates(
    store: &dyn MessageStore,
    query: &embeddings::EmbeddingVector,
    limit: usize,
) -> Result<Vec<ScoredResult>, SearchError> {
    let mut ranked = match store
        .fetch_candidates_by_vector(query, limit)
        .await
        .map_err(SearchError::Storage)?
    {
        Some(results) => results,
        None => {
            let candidates = store
                .fetch_all_embedded_candidates()
                .await
                .map_err(SearchError::Storage)?;
            debug!(candidates = candidates.len(), "Scoring candidates locally");
            embeddings::score(query, &candidates)
        }
    };

    embeddings::sort_by_similarity(&mut ranked);
    ranked.truncate(limit);
    Ok(ranked)
}

/// Keep results at or above `threshold`. When that removes everything, fall
/// back to the unfiltered list with a warning.
pub fn apply_threshold(ranked: Vec<ScoredResult>, threshold: f64) -> (Vec<ScoredResult>, Option<String>) {
    if ranked.is_empty() {
        return (ranked, None);
    }

    let filtered: Vec<ScoredResult> = ranked
        .iter()
        .filter(|r| r.similarity >= threshold)
        .cloned()
        .collect();

    if filtered.is_empty() {
        let warning = format!(
            "No results found with similarity >= {}. Showing top results.",
            threshold
        );
        (ranked, Some(warning))
    } else {
        (filtered, None)
    }
}

pub async fn semantic_search(
    store: &dyn MessageStore,
    embedder: Option<&dyn Embedder>,
    enhancer: &ResultEnhancer,
    query: SearchQuery,
) -> Result<SearchOutcome, SearchError> {
    let embedder = embedder.ok_or_else(|| {
        SearchError::Embedding(AppError::Config("GOOGLE_AI_API_KEY is not set".to_string()))
    })?;

    info!(query = %query.text, limit = query.limit, threshold = query.threshold, "Semantic search");

    let vector = embedder.embed(query.text.trim()).await.map_err(|e| {
        warn!(error = %e, "Failed to embed search query");
        SearchError::Embedding(e)
    })?;

    let ranked = ranked_candidates(store, &vector, query.limit).await?;
    let (results, warning) = apply_threshold(ranked, query.threshold);

    if let Some(warning) = &warning {
        debug!(%warning, "Threshold fallback");
    }

    let enhanced = enhancer.enhance(&query.text, results).await;

    info!(count = enhanced.results.len(), "Search completed");

    Ok(SearchOutcome {
        query: query.text,
        results: enhanced.results,
        summary: enhanced.summary,
        warning,
    })
}
