// Embeds stored messages that were saved without a vector

use thiserror::Error;
use tracing::{error, info, warn};

use super::Embedder;
use crate::db::MessageStore;
use crate::models::{BackfillReport, PendingMessage};
use crate::types::AppError;

pub const DEFAULT_BACKFILL_BATCH_SIZE: usize = 10;

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("Error fetching messages")]
    Fetch(#[source] AppError),

    #[error("Failed to generate embeddings")]
    Embedding(#[source] AppError),

    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

impl BackfillError {
    /// Detail of the underlying failure, for the `error` field of the response.
    pub fn detail(&self) -> String {
        match self {
            BackfillError::Fetch(e) | BackfillError::Embedding(e) => e.to_string(),
            BackfillError::CountMismatch { .. } => self.to_string(),
        }
    }
}

/// One backfill pass: fetch un-embedded messages, embed them in batches and
/// write each vector back. Per-message write failures are counted, not fatal.
/// A `limit` of zero or below fetches everything.
pub async fn run_backfill(
    store: &dyn MessageStore,
    embedder: &dyn Embedder,
    batch_size: usize,
    limit: Option<i64>,
) -> Result<BackfillReport, BackfillError> {
    let limit = limit.filter(|l| *l > 0);
    let pending = store.fetch_unembedded(limit).await.map_err(BackfillError::Fetch)?;

    if pending.is_empty() {
        info!("No messages found without embeddings");
        return Ok(BackfillReport {
            message: "No messages found without embeddings".to_string(),
            processed: 0,
            errors: 0,
            total: 0,
            error_details: None,
        });
    }

    let total = pending.len();
    let valid: Vec<PendingMessage> = pending
        .into_iter()
        .filter(|m| !m.content.trim().is_empty())
        .collect();

    if valid.is_empty() {
        info!(total, "No messages with valid content to process");
        return Ok(BackfillReport {
            message: "No messages with valid content to process".to_string(),
            processed: 0,
            errors: 0,
            total,
            error_details: None,
        });
    }

    info!(count = valid.len(), batch_size, "Backfilling message embeddings");

    let texts: Vec<String> = valid.iter().map(|m| m.content.clone()).collect();
    let embeddings = embedder
        .embed_batch(&texts, batch_size.max(1))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to generate embeddings for backfill");
            BackfillError::Embedding(e)
        })?;

    if embeddings.len() != valid.len() {
        return Err(BackfillError::CountMismatch {
            expected: valid.len(),
            actual: embeddings.len(),
        });
    }

    let mut processed = 0;
    let mut error_details = Vec::new();
    for (message, embedding) in valid.iter().zip(embeddings.iter()) {
        match store.store_embedding(message.id, embedding).await {
            Ok(()) => processed += 1,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "Failed to store embedding");
                error_details.push(format!("Message {}: {}", message.id, e));
            }
        }
    }

    info!(processed, errors = error_details.len(), total, "Backfill completed");

    Ok(BackfillReport {
        message: "Backfill completed".to_string(),
        processed,
        errors: error_details.len(),
        total,
        error_details: (!error_details.is_empty()).then_some(error_details),
    })
}
