//! Property tests for score reranking.

use docqa_rag::{Metadata, Reranker, RetrievedDocument, ScorePolarity, ScoreReranker};
use proptest::prelude::*;

/// Scores drawn from a small set so ties are common.
fn arb_scores() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(prop_oneof![Just(0.25f32), Just(0.5), Just(0.75), 0.0f32..1.0], 0..30)
}

fn documents(scores: &[f32]) -> Vec<RetrievedDocument> {
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| RetrievedDocument::new(i.to_string(), Metadata::new(), *score))
        .collect()
}

fn position(doc: &RetrievedDocument) -> usize {
    doc.content.parse().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Similarity scores come out non-increasing; equal scores keep retrieval order.
    #[test]
    fn similarity_order_is_stable_and_non_increasing(scores in arb_scores()) {
        let ranked = ScoreReranker::new(ScorePolarity::HigherIsBetter).rerank(documents(&scores));

        prop_assert_eq!(ranked.len(), scores.len());
        for pair in ranked.documents().windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(position(&pair[0]) < position(&pair[1]));
            }
        }
    }

    /// Distance scores come out non-decreasing; equal scores keep retrieval order.
    #[test]
    fn distance_order_is_stable_and_non_decreasing(scores in arb_scores()) {
        let ranked = ScoreReranker::new(ScorePolarity::LowerIsBetter).rerank(documents(&scores));

        prop_assert_eq!(ranked.len(), scores.len());
        for pair in ranked.documents().windows(2) {
            prop_assert!(pair[0].score <= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(position(&pair[0]) < position(&pair[1]));
            }
        }
    }

    /// Reranking is a permutation: nothing is dropped, added or altered.
    #[test]
    fn reranking_keeps_every_document(scores in arb_scores()) {
        let ranked = ScoreReranker::default().rerank(documents(&scores));

        let mut seen: Vec<usize> = ranked.iter().map(position).collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..scores.len()).collect::<Vec<_>>());
        for doc in &ranked {
            prop_assert_eq!(doc.score, scores[position(doc)]);
        }
    }
}
