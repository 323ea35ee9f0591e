//! Reranker trait for reordering retrieved documents.

use std::cmp::Ordering;

use crate::config::ScorePolarity;
use crate::document::{RankedContext, RetrievedDocument};

/// A reranker that reorders retrieved documents into a [`RankedContext`].
///
/// Rerankers are pure: no I/O and no new embedding calls. They reuse the
/// scores the vector store already produced.
pub trait Reranker: Send + Sync {
    /// Reorder `results` into final rank order.
    fn rerank(&self, results: Vec<RetrievedDocument>) -> RankedContext;
}

/// Sorts by store score, most relevant first.
///
/// The sort is stable: documents with equal scores keep the order the
/// retriever produced. Nothing is filtered, truncated or deduplicated.
/// NaN scores rank after every real score.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{ScorePolarity, ScoreReranker, Reranker};
///
/// let ranked = ScoreReranker::new(ScorePolarity::HigherIsBetter).rerank(results);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreReranker {
    polarity: ScorePolarity,
}

impl ScoreReranker {
    pub fn new(polarity: ScorePolarity) -> Self {
        Self { polarity }
    }

    fn compare(&self, a: f32, b: f32) -> Ordering {
        match self.polarity {
            ScorePolarity::HigherIsBetter => {
                let key = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
                key(b).total_cmp(&key(a))
            }
            ScorePolarity::LowerIsBetter => {
                let key = |s: f32| if s.is_nan() { f32::INFINITY } else { s };
                key(a).total_cmp(&key(b))
            }
        }
    }
}

impl Reranker for ScoreReranker {
    fn rerank(&self, mut results: Vec<RetrievedDocument>) -> RankedContext {
        results.sort_by(|a, b| self.compare(a.score, b.score));
        RankedContext::from_ranked(results)
    }
}

/// A reranker that keeps the store's native order.
///
/// Useful when the store already returns documents in final rank order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

impl Reranker for NoOpReranker {
    fn rerank(&self, results: Vec<RetrievedDocument>) -> RankedContext {
        RankedContext::from_ranked(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn docs(scores: &[f32]) -> Vec<RetrievedDocument> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| RetrievedDocument::new(format!("doc {i}"), Metadata::new(), *s))
            .collect()
    }

    fn contents(ranked: &RankedContext) -> Vec<&str> {
        ranked.iter().map(|d| d.content.as_str()).collect()
    }

    #[test]
    fn sorts_descending_for_similarity() {
        let ranked = ScoreReranker::default().rerank(docs(&[0.77, 0.91, 0.5]));
        assert_eq!(contents(&ranked), vec!["doc 1", "doc 0", "doc 2"]);
    }

    #[test]
    fn sorts_ascending_for_distance() {
        let reranker = ScoreReranker::new(ScorePolarity::LowerIsBetter);
        let ranked = reranker.rerank(docs(&[0.77, 0.91, 0.5]));
        assert_eq!(contents(&ranked), vec!["doc 2", "doc 0", "doc 1"]);
    }

    #[test]
    fn ties_keep_retrieval_order() {
        let ranked = ScoreReranker::default().rerank(docs(&[0.5, 0.9, 0.5, 0.5]));
        assert_eq!(contents(&ranked), vec!["doc 1", "doc 0", "doc 2", "doc 3"]);
    }

    #[test]
    fn nan_ranks_last() {
        let ranked = ScoreReranker::default().rerank(docs(&[f32::NAN, 0.1]));
        assert_eq!(contents(&ranked), vec!["doc 1", "doc 0"]);

        let reranker = ScoreReranker::new(ScorePolarity::LowerIsBetter);
        let ranked = reranker.rerank(docs(&[f32::NAN, 0.1]));
        assert_eq!(contents(&ranked), vec!["doc 1", "doc 0"]);
    }

    #[test]
    fn empty_input_yields_empty_context() {
        assert!(ScoreReranker::default().rerank(Vec::new()).is_empty());
    }

    #[test]
    fn noop_preserves_order() {
        let ranked = NoOpReranker.rerank(docs(&[0.1, 0.9]));
        assert_eq!(contents(&ranked), vec!["doc 0", "doc 1"]);
    }
}
