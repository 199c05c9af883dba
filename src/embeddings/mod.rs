//! Embeddings
//!
//! Text → vector conversion through the Google AI embedding endpoint, the
//! pacing policy used when embedding in batches, the local cosine scorer used
//! when the database cannot rank by vector itself, and the backfill job that
//! embeds stored messages that have no vector yet.

pub mod backfill;
pub mod client;
pub mod pacing;
pub mod similarity;

pub use backfill::*;
pub use client::*;
pub use pacing::*;
pub use similarity::*;

use crate::types::{AppError, AppResult};

/// Dimensionality produced by `text-embedding-004`.
pub const EMBEDDING_DIM: usize = 768;

/// A provider-produced embedding. Always exactly [`EMBEDDING_DIM`] components.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> AppResult<Self> {
        if values.len() != EMBEDDING_DIM {
            return Err(AppError::Provider(format!(
                "Expected a {}-dimensional embedding, got {}",
                EMBEDDING_DIM,
                values.len()
            )));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Postgres `vector` text literal, e.g. `[0.1,0.2,...]`.
    pub fn to_pg_literal(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 10 + 2);
        out.push('[');
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&v.to_string());
        }
        out.push(']');
        out
    }
}
