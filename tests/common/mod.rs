//! Deterministic embedders and generators for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use corpus_rag::engine::{EngineOptions, RetrievalEngine};
use corpus_rag::store::IndexStore;
use corpus_rag_core::embedding::Embedder;
use corpus_rag_core::generation::{ChatMessage, Generator};
use corpus_rag_core::{RagError, Result};

/// One dimension: the character count of the text.
#[derive(Default)]
pub struct CharCountEmbedder {
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Embedder for CharCountEmbedder {
    fn model_name(&self) -> &str {
        "char-count"
    }
    fn dims(&self) -> usize {
        1
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.seen.lock().unwrap().extend(texts.iter().cloned());
        Ok(texts
            .iter()
            .map(|t| vec![t.chars().count() as f32])
            .collect())
    }
}

/// Embeds a text as its first character's code point, sleeping longer for
/// earlier letters so batches complete in reverse order.
#[derive(Default)]
pub struct SlowFirstEmbedder {
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[async_trait]
impl Embedder for SlowFirstEmbedder {
    fn model_name(&self) -> &str {
        "first-char"
    }
    fn dims(&self) -> usize {
        1
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let first = texts
            .first()
            .and_then(|t| t.chars().next())
            .unwrap_or('a');
        let delay = (b'z' as u64).saturating_sub(first as u64) * 2;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| vec![t.chars().next().map(|c| c as u32 as f32).unwrap_or(0.0)])
            .collect())
    }
}

/// Succeeds for the first `ok_calls` requests, then fails.
pub struct FlakyEmbedder {
    inner: CharCountEmbedder,
    calls: AtomicUsize,
    ok_calls: usize,
}

impl FlakyEmbedder {
    pub fn new(ok_calls: usize) -> Self {
        Self {
            inner: CharCountEmbedder::default(),
            calls: AtomicUsize::new(0),
            ok_calls,
        }
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    fn model_name(&self) -> &str {
        "char-count"
    }
    fn dims(&self) -> usize {
        1
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_calls {
            return Err(RagError::provider("service unavailable"));
        }
        self.inner.embed(texts).await
    }
}

/// Claims `claimed` dimensions but returns `actual`.
pub struct WrongDimsEmbedder {
    pub claimed: usize,
    pub actual: usize,
}

#[async_trait]
impl Embedder for WrongDimsEmbedder {
    fn model_name(&self) -> &str {
        "wrong-dims"
    }
    fn dims(&self) -> usize {
        self.claimed
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.5; self.actual]).collect())
    }
}

/// Records every prompt and replies with a fixed answer.
pub struct RecordingGenerator {
    pub reply: String,
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RecordingGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recording"
    }
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn model_name(&self) -> &str {
        "failing"
    }
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(RagError::provider("quota exceeded"))
    }
}

pub fn engine_with(
    embedder: Arc<dyn Embedder>,
    dir: &std::path::Path,
    max_chars: usize,
) -> RetrievalEngine {
    RetrievalEngine::new(
        embedder,
        IndexStore::new(dir),
        EngineOptions {
            max_chars,
            batch_size: 1,
            concurrency: 4,
        },
    )
}
