//! Ingest and search through `RetrievalEngine` with deterministic embedders.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use corpus_rag::engine::{EngineOptions, RetrievalEngine};
use corpus_rag::store::IndexStore;
use corpus_rag_core::RagError;
use tempfile::TempDir;

#[tokio::test]
async fn test_nearest_chunk_by_length() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(Arc::new(CharCountEmbedder::default()), tmp.path(), 5);

    // chunks: "aaaaa" (5), "bb" (2)
    let report = engine.ingest("aaaaabb").await.unwrap();
    assert_eq!(report.chunks, 2);
    assert_eq!(report.dims, 1);
    assert_eq!(report.model, "char-count");

    let results = engine.search("ccc", 2).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, "bb");
    assert_eq!(results[0].chunk_id, "2");
    assert!((results[0].distance - 1.0).abs() < 1e-6);
    assert!((results[0].similarity - 0.5).abs() < 1e-6);
    assert!(results[0].similarity > results[1].similarity);
}

#[tokio::test]
async fn test_chunk_ids_and_tie_order() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(Arc::new(CharCountEmbedder::default()), tmp.path(), 5);
    engine.ingest("hello world").await.unwrap();

    let stored = engine.loaded().await.unwrap();
    let texts: Vec<&str> = stored.corpus.chunks().iter().map(|c| c.text.as_str()).collect();
    let ids: Vec<&str> = stored.corpus.chunks().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(texts, vec!["hello", " worl", "d"]);
    assert_eq!(ids, vec!["1", "2", "3"]);

    // "hello" and " worl" are both at distance 0; insertion order breaks the tie
    let results = engine.search("xxxxx", 3).await;
    let ids: Vec<&str> = results.iter().map(|r| r.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(results[0].similarity, 1.0);
}

#[tokio::test]
async fn test_k_larger_than_index() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(Arc::new(CharCountEmbedder::default()), tmp.path(), 5);
    engine.ingest("hello world").await.unwrap();

    assert_eq!(engine.search("hi", 50).await.len(), 3);
    assert!(engine.search("hi", 0).await.is_empty());
    assert!(engine.search("   ", 3).await.is_empty());
}

#[tokio::test]
async fn test_parallel_embedding_keeps_chunk_order() {
    let tmp = TempDir::new().unwrap();
    let embedder = Arc::new(SlowFirstEmbedder::default());
    let engine = RetrievalEngine::new(
        embedder.clone(),
        IndexStore::new(tmp.path()),
        EngineOptions {
            max_chars: 5,
            batch_size: 1,
            concurrency: 2,
        },
    );

    engine.ingest("aaaaabbbbbcccccddddd").await.unwrap();
    assert!(embedder.max_in_flight.load(Ordering::SeqCst) <= 2);

    engine.invalidate().await;
    let stored = engine.loaded().await.unwrap();
    for (i, chunk) in stored.corpus.chunks().iter().enumerate() {
        let first = chunk.text.chars().next().unwrap() as u32 as f32;
        assert_eq!(stored.corpus.index().vector(i).unwrap(), &[first][..]);
    }
}

#[tokio::test]
async fn test_embedder_sees_normalized_text() {
    let tmp = TempDir::new().unwrap();
    let embedder = Arc::new(CharCountEmbedder::default());
    let engine = engine_with(embedder.clone(), tmp.path(), 100);

    engine.ingest("line one\r\nline two\nline three").await.unwrap();
    engine.search("what\nabout\r\nthis", 1).await;

    let seen = embedder.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|t| !t.contains('\n') && !t.contains('\r')));
    assert_eq!(seen[1], "what about this");

    // stored chunk text keeps its original newlines
    drop(seen);
    let stored = engine.loaded().await.unwrap();
    assert!(stored.corpus.chunks()[0].text.contains('\n'));
}

#[tokio::test]
async fn test_cold_search() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(
        Arc::new(CharCountEmbedder::default()),
        &tmp.path().join("missing"),
        5,
    );

    assert!(engine.search("anything", 3).await.is_empty());
    let err = engine.try_search("anything", 3).await.unwrap_err();
    assert!(matches!(err, RagError::ArtifactNotFound(_)));
    assert!(err.is_cold());
}

#[tokio::test]
async fn test_empty_corpus_rejected() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(Arc::new(CharCountEmbedder::default()), tmp.path(), 5);

    assert!(matches!(engine.ingest("").await, Err(RagError::EmptyCorpus)));
    assert!(matches!(
        engine.ingest(" \n\t ").await,
        Err(RagError::EmptyCorpus)
    ));
    assert!(!engine.store().exists());
}

#[tokio::test]
async fn test_failed_ingest_keeps_previous_index() {
    let tmp = TempDir::new().unwrap();
    let first = engine_with(Arc::new(CharCountEmbedder::default()), tmp.path(), 5);
    let report = first.ingest("hello world").await.unwrap();

    // second run fails on its second batch
    let second = engine_with(Arc::new(FlakyEmbedder::new(1)), tmp.path(), 5);
    let err = second.ingest("a completely different corpus").await.unwrap_err();
    assert!(matches!(err, RagError::Provider(_)));

    let manifest = IndexStore::new(tmp.path()).load().unwrap().manifest;
    assert_eq!(manifest.corpus_hash, report.corpus_hash);
    assert_eq!(manifest.chunk_count, 3);
}

#[tokio::test]
async fn test_dimension_mismatch_on_ingest() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(
        Arc::new(WrongDimsEmbedder {
            claimed: 3,
            actual: 2,
        }),
        tmp.path(),
        5,
    );

    let err = engine.ingest("hello world").await.unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
    assert!(!engine.store().exists());
}

#[tokio::test]
async fn test_empty_embeddings_are_a_provider_error() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(
        Arc::new(WrongDimsEmbedder {
            claimed: 0,
            actual: 0,
        }),
        tmp.path(),
        5,
    );

    let err = engine.ingest("hello world").await.unwrap_err();
    assert!(matches!(err, RagError::Provider(_)), "got {:?}", err);
    assert!(!engine.store().exists());
}

#[tokio::test]
async fn test_query_dimension_mismatch() {
    let tmp = TempDir::new().unwrap();
    let builder = engine_with(Arc::new(CharCountEmbedder::default()), tmp.path(), 5);
    builder.ingest("hello world").await.unwrap();

    // index holds 1-d vectors, this engine embeds queries in 4-d
    let reader = engine_with(
        Arc::new(WrongDimsEmbedder {
            claimed: 4,
            actual: 4,
        }),
        tmp.path(),
        5,
    );
    let err = reader.try_search("hello", 2).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { .. }));
    assert!(reader.search("hello", 2).await.is_empty());
}

#[tokio::test]
async fn test_invalidate_reloads_from_disk() {
    let tmp = TempDir::new().unwrap();
    let reader = engine_with(Arc::new(CharCountEmbedder::default()), tmp.path(), 5);
    let writer = engine_with(Arc::new(CharCountEmbedder::default()), tmp.path(), 5);

    writer.ingest("hello world").await.unwrap();
    assert_eq!(reader.search("xxxxx", 10).await.len(), 3);

    writer.ingest("tiny").await.unwrap();
    // still serving the cached generation
    assert_eq!(reader.search("xxxxx", 10).await.len(), 3);

    reader.invalidate().await;
    let results = reader.search("xxxxx", 10).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "tiny");
}

#[tokio::test]
async fn test_reingest_replaces_index() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(Arc::new(CharCountEmbedder::default()), tmp.path(), 5);

    engine.ingest("hello world").await.unwrap();
    engine.ingest("abc").await.unwrap();

    let results = engine.search("abc", 5).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "abc");
    assert_eq!(IndexStore::new(tmp.path()).load().unwrap().manifest.chunk_count, 1);
}
