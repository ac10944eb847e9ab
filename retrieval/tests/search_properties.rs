//! Integration tests for search behavior over built corpora.
//!
//! Uses the deterministic providers from `retrieval_test_support` so
//! identical text always embeds to the identical vector.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use retrieval_test_support::{CharProvider, FailingProvider};
use saathi_retrieval::{
    DistanceMetric, EmbeddingClient, IndexState, QueryEngine, QueryResponse, RetrievalError,
    RetryPolicy, SemanticIndex, default_corpus,
};

const SENTENCES: [&str; 8] = [
    "a cat sat",
    "a dog ran",
    "the sky is blue",
    "grass grows green",
    "rivers flow downhill",
    "stars shine at night",
    "bread is baked daily",
    "trains leave on time",
];

fn live_client() -> EmbeddingClient {
    EmbeddingClient::new(Arc::new(CharProvider::new()))
}

async fn built_index(n: usize) -> SemanticIndex {
    let index = SemanticIndex::new(live_client());
    index.build(SENTENCES.iter().take(n).copied()).await.unwrap();
    index
}

#[tokio::test]
async fn test_result_length_order_and_uniqueness() {
    for n in 0..=SENTENCES.len() {
        let index = built_index(n).await;
        for k in [0, 1, 2, 5, 10, 100] {
            let result = index.search("what is blue?", k).await.unwrap();

            assert_eq!(result.len(), k.min(n), "n={n} k={k}");

            let distances: Vec<f32> = result.matches.iter().map(|m| m.distance).collect();
            assert!(
                distances.windows(2).all(|w| w[0] <= w[1]),
                "not sorted for n={n} k={k}: {distances:?}"
            );

            let ids: HashSet<usize> = result.document_ids().into_iter().collect();
            assert_eq!(ids.len(), result.len(), "duplicate ids for n={n} k={k}");
        }
    }
}

#[tokio::test]
async fn test_every_document_finds_itself() {
    for metric in [DistanceMetric::L2, DistanceMetric::Cosine] {
        let index = SemanticIndex::new(live_client()).with_metric(metric);
        index.build(SENTENCES).await.unwrap();

        for document in index.corpus().unwrap().documents() {
            let result = index.search(&document.text, 1).await.unwrap();
            assert_eq!(
                result.document_ids(),
                vec![document.id],
                "{metric:?}: {}",
                document.text
            );
            assert!(!result.query_is_fallback);
        }
    }
}

#[tokio::test]
async fn test_exact_match_scenario() {
    let index = built_index(3).await;
    let result = index.search("a cat sat", 1).await.unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(index.text(result.matches[0].document_id), Some("a cat sat"));
    assert_eq!(result.matches[0].distance, 0.0);
}

#[tokio::test]
async fn test_k_exceeding_corpus_scenario() {
    let index = built_index(3).await;
    let result = index.search("anything at all", 10).await.unwrap();
    assert_eq!(result.len(), 3);
}

#[tokio::test]
async fn test_empty_corpus_with_failing_provider() {
    let client = EmbeddingClient::new(Arc::new(FailingProvider::new()))
        .with_fallback(saathi_retrieval::FallbackMode::Disabled);
    let index = SemanticIndex::new(client);
    index.build(Vec::<String>::new()).await.unwrap();

    let result = index.search("anything", 3).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_build_survives_total_provider_failure() {
    let provider = Arc::new(FailingProvider::new());
    let client = EmbeddingClient::new(provider.clone()).with_retry(
        RetryPolicy::default().with_backoff_unit(Duration::from_millis(1)),
    );
    let index = SemanticIndex::new(client);

    let report = index.build(SENTENCES).await.unwrap();

    assert_eq!(index.state(), IndexState::Ready);
    assert_eq!(report.documents, SENTENCES.len());
    assert_eq!(report.fallback_ids, (0..SENTENCES.len()).collect::<Vec<_>>());
    assert_eq!(report.dimension, CharProvider::DIMENSION);
    // Three attempts per document.
    assert_eq!(provider.calls(), SENTENCES.len() * 3);
}

#[tokio::test]
async fn test_concurrent_searches_share_index() {
    let engine = Arc::new(
        QueryEngine::builder(live_client())
            .with_corpus(SENTENCES)
            .with_top_k(1)
            .build(),
    );
    engine.build_index().await.unwrap();

    let handles: Vec<_> = SENTENCES
        .iter()
        .map(|text| {
            let engine = Arc::clone(&engine);
            let text = (*text).to_string();
            tokio::spawn(async move { (text.clone(), engine.handle_query(&text).await) })
        })
        .collect();

    for handle in handles {
        let (text, response) = handle.await.unwrap();
        assert_eq!(response.unwrap(), QueryResponse::Matches { matches: vec![text] });
    }
}

#[tokio::test]
async fn test_default_corpus_engine() {
    let engine = QueryEngine::builder(live_client()).build();
    assert!(matches!(
        engine.handle_query("UPI").await,
        Err(RetrievalError::IndexNotReady)
    ));

    let report = engine.build_index().await.unwrap();
    assert_eq!(report.documents, default_corpus().len());

    let response = engine.handle_query(&default_corpus()[1]).await.unwrap();
    assert_eq!(response.matches()[0], default_corpus()[1]);
}
