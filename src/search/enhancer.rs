// AI re-ranking and summarisation of search results

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::extract::extract_analysis;
use crate::llm::LLMAdapter;
use crate::models::ScoredResult;
use crate::types::{LLMMessage, LLMRequest};

const PREVIEW_CHARS: usize = 200;

// Low temperature keeps the reply close to the requested JSON shape.
const ENHANCE_TEMPERATURE: f32 = 0.2;
const ENHANCE_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementOutcome {
    pub results: Vec<ScoredResult>,
    pub summary: Option<String>,
}

impl EnhancementOutcome {
    fn unchanged(results: Vec<ScoredResult>) -> Self {
        Self { results, summary: None }
    }
}

/// Wraps an optional generation backend. Without one, every call is a
/// pass-through. Never returns an error.
pub struct ResultEnhancer {
    adapter: Option<Arc<dyn LLMAdapter>>,
}

impl ResultEnhancer {
    pub fn new(adapter: Option<Arc<dyn LLMAdapter>>) -> Self {
        Self { adapter }
    }

    pub fn disabled() -> Self {
        Self { adapter: None }
    }

    pub async fn enhance(&self, query: &str, results: Vec<ScoredResult>) -> EnhancementOutcome {
        let Some(adapter) = &self.adapter else {
            debug!("No generation provider configured, skipping enhancement");
            return EnhancementOutcome::unchanged(results);
        };
        if results.is_empty() {
            return EnhancementOutcome::unchanged(results);
        }

        let request = LLMRequest {
            model: adapter.default_model().to_string(),
            messages: vec![LLMMessage::user(build_prompt(query, &results))],
            max_tokens: Some(ENHANCE_MAX_TOKENS),
            temperature: Some(ENHANCE_TEMPERATURE),
        };

        let response = match adapter.create_chat_completion(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Search enhancement failed, returning results unranked");
                return EnhancementOutcome::unchanged(results);
            }
        };

        let Some(analysis) = extract_analysis(&response.content) else {
            warn!("Could not parse enhancement response, returning results unranked");
            return EnhancementOutcome::unchanged(results);
        };

        let summary = analysis.clean_summary();
        let results = if analysis.ranked_results.is_some() {
            rerank(results, &analysis.relevance_scores())
        } else {
            results
        };

        debug!(count = results.len(), has_summary = summary.is_some(), "Enhanced search results");
        EnhancementOutcome { results, summary }
    }
}

/// Prompt listing every result with its similarity and a content preview.
pub fn build_prompt(query: &str, results: &[ScoredResult]) -> String {
    let listing = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let preview: String = r.content.chars().take(PREVIEW_CHARS).collect();
            let ellipsis = if r.content.chars().count() > PREVIEW_CHARS { "..." } else { "" };
            format!(
                "{}. [Similarity: {:.1}%] {}{}",
                i + 1,
                r.similarity * 100.0,
                preview,
                ellipsis
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Search keywords: "{query}"

I found these semantically related messages from a chat application:

{listing}

Please analyze these messages and:
1. Identify which messages are most semantically related to the search query "{query}"
2. Rank them by relevance (not just similarity score)
3. Provide a brief summary of what these messages are about

Return your response as JSON in this exact format:
{{
  "summary": "Brief summary of what these messages discuss",
  "rankedResults": [
    {{
      "index": 1,
      "reason": "Why this message is relevant",
      "relevanceScore": 0.95
    }}
  ]
}}

Only include messages that are actually relevant to the search query. Exclude messages that are not semantically related."#
    )
}

/// Stable descending sort by model relevance, falling back to similarity for
/// results the model did not score. Nothing is dropped.
pub fn rerank(results: Vec<ScoredResult>, scores: &HashMap<usize, f64>) -> Vec<ScoredResult> {
    let mut keyed: Vec<(f64, ScoredResult)> = results
        .into_iter()
        .enumerate()
        .map(|(i, r)| (scores.get(&i).copied().unwrap_or(r.similarity), r))
        .collect();

    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    keyed.into_iter().map(|(_, r)| r).collect()
}
