//! Google AI embedding client
//!
//! Calls `{base}/v1beta/models/{model}:embedContent` and returns the
//! 768-dimensional `embedding.values` vector. The Gemini embedding API has no
//! native batching, so `embed_batch` fans out single calls chunk by chunk.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::pacing::Pacer;
use super::EmbeddingVector;
use crate::config::GoogleAiConfig;
use crate::types::{AppError, AppResult};

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one non-empty text.
    async fn embed(&self, text: &str) -> AppResult<EmbeddingVector>;

    /// Embed every text, output order matching input order.
    async fn embed_batch(&self, texts: &[String], batch_size: usize) -> AppResult<Vec<EmbeddingVector>>;
}

/// Embed `texts` in chunks of `batch_size`: calls inside a chunk run
/// concurrently, chunks run one after another with `pacer` awaited between
/// them. The first failure fails the whole batch and drops the rest of its chunk.
pub async fn embed_in_chunks<E>(
    embedder: &E,
    texts: &[String],
    batch_size: usize,
    pacer: &dyn Pacer,
) -> AppResult<Vec<EmbeddingVector>>
where
    E: Embedder + ?Sized,
{
    let batch_size = batch_size.max(1);
    let mut embeddings = Vec::with_capacity(texts.len());

    for (i, chunk) in texts.chunks(batch_size).enumerate() {
        if i > 0 {
            pacer.pause().await;
        }
        debug!(chunk = i, size = chunk.len(), "Embedding chunk");
        let vectors = try_join_all(chunk.iter().map(|text| embedder.embed(text))).await?;
        embeddings.extend(vectors);
    }

    Ok(embeddings)
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: EmbedContent<'a>,
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Option<Vec<f32>>,
}

pub struct GoogleEmbeddingClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    pacer: Arc<dyn Pacer>,
}

impl GoogleEmbeddingClient {
    /// Build a client from configuration. Fails with a configuration error when
    /// no API key is set, so a misconfigured deployment is caught at startup.
    pub fn new(config: &GoogleAiConfig, pacer: Arc<dyn Pacer>) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("GOOGLE_AI_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            pacer,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:embedContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Embedder for GoogleEmbeddingClient {
    async fn embed(&self, text: &str) -> AppResult<EmbeddingVector> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Text cannot be empty".to_string()));
        }

        let request = EmbedContentRequest {
            model: &self.model,
            content: EmbedContent {
                parts: vec![EmbedPart { text }],
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Provider(format!("Embedding request timed out: {}", e))
                } else {
                    AppError::Provider(format!("Embedding request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Google AI API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse embedding response: {}", e)))?;

        let values = body
            .embedding
            .and_then(|e| e.values)
            .ok_or_else(|| AppError::Provider("Invalid response format from Google AI API".to_string()))?;

        EmbeddingVector::new(values)
    }

    async fn embed_batch(&self, texts: &[String], batch_size: usize) -> AppResult<Vec<EmbeddingVector>> {
        info!(count = texts.len(), batch_size, "Generating embeddings in batches");
        embed_in_chunks(self, texts, batch_size, self.pacer.as_ref()).await
    }
}
