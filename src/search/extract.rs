//! Best-effort extraction of the enhancer's JSON payload from free-form
//! model output.
//!
//! Stages, tried in order:
//! 1. a fenced ```` ```json ```` block
//! 2. the first balanced top-level `{ ... }` object in the text
//! 3. a regex that pulls out just the summary line
//!
//! Every stage is a pure function returning `Option`; nothing here errors.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid fenced-block regex"));

static QUOTED_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)summary["\s:]+"([^"]+)""#).expect("valid summary regex"));

static LINE_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)summary:?\s*([^\n]+)").expect("valid summary regex"));

/// What the model said about a result list.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AiAnalysis {
    pub summary: Option<String>,
    /// Kept untyped so one malformed entry does not discard the whole list.
    pub ranked_results: Option<Vec<Value>>,
}

impl AiAnalysis {
    /// Read the fields off any JSON object. A field of the wrong type is
    /// treated as absent rather than failing the whole payload.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            summary: object
                .get("summary")
                .and_then(Value::as_str)
                .map(str::to_string),
            ranked_results: object
                .get("rankedResults")
                .and_then(Value::as_array)
                .cloned(),
        })
    }

    /// Relevance score per 0-based result position. Entries without a
    /// positive integer `index` or a finite numeric `relevanceScore` are ignored.
    pub fn relevance_scores(&self) -> HashMap<usize, f64> {
        let mut scores = HashMap::new();
        let Some(ranked) = &self.ranked_results else {
            return scores;
        };

        for entry in ranked {
            let index = entry.get("index").and_then(Value::as_u64);
            let score = entry.get("relevanceScore").and_then(Value::as_f64);
            if let (Some(index), Some(score)) = (index, score) {
                if index >= 1 && score.is_finite() {
                    scores.insert((index - 1) as usize, score);
                }
            }
        }
        scores
    }

    /// Summary with surrounding whitespace removed; `None` when blank.
    pub fn clean_summary(&self) -> Option<String> {
        self.summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Contents of the first ```` ```json ```` fenced block.
pub fn fenced_json_block(text: &str) -> Option<&str> {
    FENCED_JSON
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// The first balanced `{ ... }` object, honouring braces inside JSON strings.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Summary text found by pattern alone, for output that is not valid JSON.
pub fn summary_fallback(text: &str) -> Option<String> {
    QUOTED_SUMMARY
        .captures(text)
        .or_else(|| LINE_SUMMARY.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Run the whole chain over a raw model response.
pub fn extract_analysis(text: &str) -> Option<AiAnalysis> {
    let json = fenced_json_block(text).or_else(|| first_json_object(text));

    if let Some(json) = json {
        let parsed = serde_json::from_str::<Value>(json)
            .ok()
            .and_then(|value| AiAnalysis::from_value(&value));
        if let Some(analysis) = parsed {
            return Some(analysis);
        }
    }

    summary_fallback(text).map(|summary| AiAnalysis {
        summary: Some(summary),
        ranked_results: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block() {
        let text = "Here you go:\n```json\n{\"summary\": \"limits\"}\n```\nThanks";
        assert_eq!(fenced_json_block(text), Some("{\"summary\": \"limits\"}"));
        assert_eq!(fenced_json_block("no fence here"), None);
    }

    #[test]
    fn test_first_object_is_balanced_and_ignores_string_braces() {
        let text = r#"prefix {"summary": "a } b", "x": {"y": 1}} trailing {"z": 2}"#;
        assert_eq!(
            first_json_object(text),
            Some(r#"{"summary": "a } b", "x": {"y": 1}}"#)
        );
        assert_eq!(first_json_object(r#"{"a": "\"}"}"#), Some(r#"{"a": "\"}"}"#));
        assert_eq!(first_json_object("{ never closed"), None);
        assert_eq!(first_json_object("nothing"), None);
    }

    #[test]
    fn test_summary_fallback_patterns() {
        assert_eq!(
            summary_fallback(r#"{"summary": "Talk about limits", broken"#),
            Some("Talk about limits".to_string())
        );
        assert_eq!(
            summary_fallback("Summary: people discuss payment caps\nmore"),
            Some("people discuss payment caps".to_string())
        );
        assert_eq!(summary_fallback("nothing useful"), None);
    }

    #[test]
    fn test_extract_full_payload() {
        let text = "```json\n{\"summary\":\"Limits\",\"rankedResults\":[{\"index\":2,\"reason\":\"r\",\"relevanceScore\":0.9}]}\n```";
        let analysis = extract_analysis(text).unwrap();
        assert_eq!(analysis.clean_summary().as_deref(), Some("Limits"));
        assert_eq!(analysis.relevance_scores().get(&1), Some(&0.9));
    }

    #[test]
    fn test_extract_falls_back_to_summary_on_bad_json() {
        let text = "{ summary: \"not json\", rankedResults: [ }";
        let analysis = extract_analysis(text).unwrap();
        assert_eq!(analysis.summary.as_deref(), Some("not json"));
        assert!(analysis.ranked_results.is_none());
    }

    #[test]
    fn test_extract_gives_up() {
        assert_eq!(extract_analysis("I cannot help with that."), None);
        assert_eq!(extract_analysis(""), None);
    }

    #[test]
    fn test_relevance_scores_skip_malformed_entries() {
        let analysis = AiAnalysis::from_value(&serde_json::json!({
            "rankedResults": [
                { "index": 1, "relevanceScore": 0.7 },
                { "index": 0, "relevanceScore": 0.9 },
                { "index": "2", "relevanceScore": 0.9 },
                { "index": 3 },
                "garbage",
                { "index": 4, "relevanceScore": 0.0 }
            ]
        }))
        .unwrap();

        let scores = analysis.relevance_scores();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&0], 0.7);
        assert_eq!(scores[&3], 0.0);
    }

    #[test]
    fn test_mistyped_fields_keep_the_rest_of_the_payload() {
        let text = r#"{"summary": "Limits", "rankedResults": "none"}"#;
        let analysis = extract_analysis(text).unwrap();
        assert_eq!(analysis.summary.as_deref(), Some("Limits"));
        assert!(analysis.ranked_results.is_none());

        let text = r#"{"summary": 42, "rankedResults": [{"index": 1, "relevanceScore": 0.5}]}"#;
        let analysis = extract_analysis(text).unwrap();
        assert!(analysis.summary.is_none());
        assert_eq!(analysis.relevance_scores().get(&0), Some(&0.5));
    }

    #[test]
    fn test_blank_summary_is_none() {
        let analysis = AiAnalysis {
            summary: Some("   ".to_string()),
            ranked_results: None,
        };
        assert_eq!(analysis.clean_summary(), None);
    }
}
