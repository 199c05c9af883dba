// In-process cosine scoring, used when the database cannot rank by vector itself

use std::cmp::Ordering;

use super::EmbeddingVector;
use crate::models::{Candidate, ScoredResult};

/// Cosine similarity of two equal-length vectors. `None` for mismatched
/// lengths, empty input, or a zero-norm vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some((dot / denom).clamp(-1.0, 1.0))
}

/// Score every candidate that carries a usable embedding against `query`,
/// highest similarity first. Candidates without an embedding, or whose
/// embedding has the wrong dimensionality, are skipped.
pub fn score(query: &EmbeddingVector, candidates: &[Candidate]) -> Vec<ScoredResult> {
    let query = query.as_slice();
    let mut scored: Vec<ScoredResult> = candidates
        .iter()
        .filter_map(|candidate| {
            let embedding = candidate.embedding.as_deref()?;
            let similarity = cosine_similarity(query, embedding)?;
            Some(ScoredResult::from_candidate(candidate, similarity))
        })
        .collect();

    sort_by_similarity(&mut scored);
    scored
}

/// Stable descending sort by similarity.
pub fn sort_by_similarity(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EMBEDDING_DIM;
    use uuid::Uuid;

    fn unit(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        v[axis] = 1.0;
        v
    }

    fn blend(x: f32, y: f32) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        v[0] = x;
        v[1] = y;
        v
    }

    fn candidate(content: &str, embedding: Option<Vec<f32>>) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content: content.to_string(),
            created_at: None,
            embedding,
        }
    }

    #[test]
    fn test_cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-9);
        // Scale-invariant
        let a = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((a - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), None);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn test_score_orders_descending() {
        let query = EmbeddingVector::new(unit(0)).unwrap();
        let candidates = vec![
            candidate("far", Some(unit(1))),
            candidate("close", Some(blend(0.9, 0.1))),
            candidate("exact", Some(unit(0))),
            candidate("middle", Some(blend(0.5, 0.5))),
        ];

        let scored = score(&query, &candidates);

        let order: Vec<&str> = scored.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(order, vec!["exact", "close", "middle", "far"]);
        assert!(scored.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn test_score_skips_missing_and_mismatched_embeddings() {
        let query = EmbeddingVector::new(unit(0)).unwrap();
        let candidates = vec![
            candidate("none", None),
            candidate("short", Some(vec![1.0, 0.0, 0.0])),
            candidate("orthogonal", Some(unit(5))),
        ];

        let scored = score(&query, &candidates);

        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].content, "orthogonal");
        assert!(scored[0].similarity.abs() < 1e-9);
    }

    #[test]
    fn test_score_projects_candidate_fields() {
        let query = EmbeddingVector::new(unit(0)).unwrap();
        let c = candidate("hello", Some(unit(0)));
        let scored = score(&query, std::slice::from_ref(&c));
        assert_eq!(scored[0].id, c.id);
        assert_eq!(scored[0].conversation_id, c.conversation_id);
        assert_eq!(scored[0].author_id, c.author_id);
    }
}
