//! Reranker trait for re-scoring retrieval candidates.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// One reranked candidate: its index in the submitted candidate list and
/// its relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankHit {
    /// Position of the candidate in the list passed to [`Reranker::rerank`].
    pub index: usize,
    /// Relevance score (higher is more relevant).
    pub score: f32,
}

/// A relevance model that jointly scores a query against candidate texts.
///
/// Implementations can call cross-encoder services, LLM-based scorers, or
/// local heuristics. They return a ranked subset of at most `top_n`
/// candidates, best first, each identified by its original index.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// Rank `candidates` against `query`, returning at most `top_n` hits.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[&str],
        top_n: usize,
    ) -> Result<Vec<RerankHit>>;
}

/// Validate a reranker's hits against the submitted candidates.
///
/// Rejects hits that point outside the candidate list or repeat a
/// candidate, and keeps at most `top_n` of them in the order received.
pub fn check_hits(
    reranker: &str,
    hits: Vec<RerankHit>,
    candidate_count: usize,
    top_n: usize,
) -> Result<Vec<RerankHit>> {
    let mut seen = HashSet::with_capacity(hits.len());
    for hit in &hits {
        if hit.index >= candidate_count {
            return Err(RagError::RerankerError {
                reranker: reranker.to_string(),
                message: format!(
                    "hit index {} out of range for {candidate_count} candidates",
                    hit.index
                ),
            });
        }
        if !seen.insert(hit.index) {
            return Err(RagError::RerankerError {
                reranker: reranker.to_string(),
                message: format!("candidate {} ranked more than once", hit.index),
            });
        }
    }
    Ok(hits.into_iter().take(top_n).collect())
}

/// A reranker that keeps the incoming order.
///
/// Scores decrease with rank (`1 / (rank + 1)`), so passages still carry a
/// usable relevance value. Useful as a default when no scoring service is
/// configured.
///
/// # Example
///
/// ```rust,ignore
/// use newsrag::NoOpReranker;
///
/// let hits = NoOpReranker.rerank("query", &["a", "b"], 5).await?;
/// // hits[0].index == 0, hits[1].index == 1
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    fn name(&self) -> &str {
        "NoOp"
    }

    async fn rerank(
        &self,
        _query: &str,
        candidates: &[&str],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        Ok((0..candidates.len().min(top_n))
            .map(|index| RerankHit { index, score: 1.0 / (index as f32 + 1.0) })
            .collect())
    }
}

/// Scores candidates by how many query keywords they contain.
///
/// Keywords are the lower-cased query words longer than three characters.
/// Ties keep the incoming order, so the ANN ranking breaks them.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordReranker;

impl KeywordReranker {
    fn keywords(query: &str) -> Vec<String> {
        let mut keywords: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 3)
            .map(str::to_lowercase)
            .collect();
        keywords.sort();
        keywords.dedup();
        keywords
    }
}

#[async_trait]
impl Reranker for KeywordReranker {
    fn name(&self) -> &str {
        "Keyword"
    }

    async fn rerank(
        &self,
        query: &str,
        candidates: &[&str],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        let keywords = Self::keywords(query);
        let mut hits: Vec<RerankHit> = candidates
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let text = text.to_lowercase();
                let matches = keywords.iter().filter(|kw| text.contains(kw.as_str())).count();
                let score =
                    if keywords.is_empty() { 0.0 } else { matches as f32 / keywords.len() as f32 };
                RerankHit { index, score }
            })
            .collect();

        // sort_by is stable: equal scores keep candidate order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_n);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_keeps_order_and_truncates() {
        let hits = NoOpReranker.rerank("q", &["a", "b", "c"], 2).await.unwrap();
        assert_eq!(hits.iter().map(|h| h.index).collect::<Vec<_>>(), vec![0, 1]);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn keyword_prefers_matching_candidates() {
        let candidates = ["Python is great for data science", "Rust vector database search"];
        let hits = KeywordReranker.rerank("vector database search", &candidates, 5).await.unwrap();
        assert_eq!(hits[0].index, 1);
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn keyword_ties_keep_incoming_order() {
        let hits = KeywordReranker.rerank("zzzz", &["a", "b", "c"], 3).await.unwrap();
        assert_eq!(hits.iter().map(|h| h.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn check_hits_rejects_out_of_range_and_duplicates() {
        let out = vec![RerankHit { index: 3, score: 1.0 }];
        assert!(matches!(check_hits("X", out, 3, 5), Err(RagError::RerankerError { .. })));

        let dup = vec![RerankHit { index: 0, score: 1.0 }, RerankHit { index: 0, score: 0.5 }];
        assert!(check_hits("X", dup, 3, 5).is_err());
    }

    #[test]
    fn check_hits_truncates_to_top_n() {
        let hits = (0..4).map(|i| RerankHit { index: i, score: 1.0 }).collect();
        assert_eq!(check_hits("X", hits, 4, 2).unwrap().len(), 2);
    }
}
