//! Property tests for in-memory vector store search ordering.

use docqa_rag::inmemory::{InMemoryVectorStore, StoredChunk};
use docqa_rag::vectorstore::VectorStore;
use docqa_rag::{Metadata, RagError};
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

/// Generate a stored chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = StoredChunk> {
    ("[a-z ]{5,30}", arb_normalized_embedding(dim))
        .prop_map(|(text, embedding)| StoredChunk::new(text, Metadata::new(), embedding))
}

/// Searching a namespace returns at most `top_k` results, most similar first,
/// and never anything stored under another namespace.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
            other in proptest::collection::vec(arb_chunk(DIM), 0..5),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let stored = chunks.len();
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.upsert("acme", "policies", chunks).await;
                store.upsert("acme", "handbook", other).await;
                store.search("acme", "policies", &query, top_k).await.unwrap()
            });

            prop_assert!(results.len() <= top_k);
            prop_assert_eq!(results.len(), stored.min(top_k));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

#[tokio::test]
async fn created_index_without_namespace_is_not_found() {
    let store = InMemoryVectorStore::new();
    store.create_index("acme").await;

    let err = store.search("acme", "policies", &[1.0, 0.0], 3).await.unwrap_err();
    assert!(matches!(err, RagError::NotFound { namespace: Some(_), .. }));
    assert_eq!(err.to_string(), "Not found: index 'acme', namespace 'policies'");
}
