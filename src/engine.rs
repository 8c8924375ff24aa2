//! Retrieval engine: ingestion and query-time search.
//!
//! ```text
//! ingest:  corpus ─▶ chunk_text ─▶ Embedder (bounded parallel) ─▶ CorpusIndex ─▶ IndexStore::save
//! search:  query ─▶ Embedder ─▶ CorpusIndex::search ─▶ SearchResult[]
//!                                    ▲
//!                        IndexStore::load (once, cached)
//! ```
//!
//! The engine owns a process-local cache of the loaded index. It is filled
//! on the first search, replaced after a successful ingest, and dropped by
//! [`RetrievalEngine::invalidate`].

use std::sync::Arc;
use std::time::Instant;

use corpus_rag_core::chunk::{chunk_text, content_hash};
use corpus_rag_core::embedding::{normalize_input, Embedder};
use corpus_rag_core::models::{Chunk, EmbeddedChunk, SearchResult};
use corpus_rag_core::search::CorpusIndex;
use corpus_rag_core::{RagError, Result};
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::progress::{IngestEvent, NoProgress, ProgressReporter};
use crate::store::{IndexStore, Manifest, StoredIndex};

/// Ingestion tuning, decoupled from the file config.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Maximum characters per chunk.
    pub max_chars: usize,
    /// Chunks per embedding request.
    pub batch_size: usize,
    /// Embedding requests in flight at once.
    pub concurrency: usize,
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_chars: config.chunking.max_chars,
            batch_size: config.embedding.batch_size,
            concurrency: config.embedding.concurrency,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_chars: 10_000,
            batch_size: 16,
            concurrency: 4,
        }
    }
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub chunks: usize,
    pub dims: usize,
    pub model: String,
    pub corpus_hash: String,
    pub elapsed_secs: f64,
}

pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    store: IndexStore,
    options: EngineOptions,
    cache: RwLock<Option<Arc<StoredIndex>>>,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn Embedder>, store: IndexStore, options: EngineOptions) -> Self {
        Self {
            embedder,
            store,
            options,
            cache: RwLock::new(None),
        }
    }

    pub fn from_config(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(
            embedder,
            IndexStore::new(&config.index.dir),
            EngineOptions::from_config(config),
        )
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Rebuild the index from `corpus`, replacing any previous artifacts.
    pub async fn ingest(&self, corpus: &str) -> Result<IngestReport> {
        self.ingest_with_progress(corpus, &NoProgress).await
    }

    /// [`ingest`](Self::ingest) with progress events.
    ///
    /// Every chunk is embedded before anything is written, so a failure
    /// leaves the previous artifacts untouched.
    pub async fn ingest_with_progress(
        &self,
        corpus: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<IngestReport> {
        let started = Instant::now();
        if corpus.trim().is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let chunks = chunk_text(corpus, self.options.max_chars);
        tracing::info!(
            chars = corpus.chars().count(),
            chunks = chunks.len(),
            max_chars = self.options.max_chars,
            "chunked corpus"
        );
        progress.report(IngestEvent::Chunked {
            chunks: chunks.len() as u64,
        });

        let embedded = self.embed_chunks(chunks, progress).await?;
        let corpus_index = CorpusIndex::build(embedded)?;

        let expected = self.embedder.dims();
        if expected > 0 && corpus_index.dims() != expected {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: corpus_index.dims(),
            });
        }

        let manifest = Manifest::new(
            self.embedder.model_name(),
            content_hash(corpus),
            &corpus_index,
        );
        progress.report(IngestEvent::Writing {
            dir: self.store.dir().display().to_string(),
        });
        self.store.save(&corpus_index, &manifest)?;

        let report = IngestReport {
            chunks: corpus_index.len(),
            dims: corpus_index.dims(),
            model: manifest.model.clone(),
            corpus_hash: manifest.corpus_hash.clone(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        progress.report(IngestEvent::Done {
            chunks: report.chunks as u64,
            dims: report.dims as u64,
        });

        *self.cache.write().await = Some(Arc::new(StoredIndex {
            manifest,
            corpus: corpus_index,
        }));
        tracing::info!(chunks = report.chunks, dims = report.dims, "index rebuilt");
        Ok(report)
    }

    /// Embed chunks in batches with at most `concurrency` requests in flight.
    ///
    /// `buffered` yields batch results in submission order, so the output
    /// follows chunk order whatever order the requests complete in.
    async fn embed_chunks(
        &self,
        chunks: Vec<Chunk>,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<EmbeddedChunk>> {
        let total = chunks.len();
        let batch_size = self.options.batch_size.max(1);
        let embedder = &self.embedder;

        let batches: Vec<Vec<String>> = chunks
            .chunks(batch_size)
            .map(|batch| batch.iter().map(|c| normalize_input(&c.text)).collect())
            .collect();

        let mut results = stream::iter(batches.into_iter().map(|texts| async move {
            let vectors = embedder.embed(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(RagError::provider(format!(
                    "embedder returned {} vectors for {} inputs",
                    vectors.len(),
                    texts.len()
                )));
            }
            Ok::<_, RagError>(vectors)
        }))
        .buffered(self.options.concurrency.max(1));

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(total);
        while let Some(batch) = results.next().await {
            vectors.extend(batch?);
            tracing::debug!(done = vectors.len(), total, "embedded batch");
            progress.report(IngestEvent::Embedding {
                done: vectors.len() as u64,
                total: total as u64,
            });
        }

        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect())
    }

    /// Search the persisted index, most similar first.
    ///
    /// Errors are typed: a missing index is [`RagError::ArtifactNotFound`],
    /// a failed query embedding is [`RagError::Provider`]. A blank query or
    /// `k = 0` returns an empty list without touching the embedder.
    pub async fn try_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let loaded = self.loaded().await?;
        let query_vec = self
            .embedder
            .embed(&[normalize_input(query)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::provider("Empty embedding response"))?;

        let results = loaded.corpus.search(&query_vec, k)?;
        tracing::debug!(k, hits = results.len(), "search complete");
        Ok(results)
    }

    /// Lenient [`try_search`](Self::try_search): any failure is logged and
    /// reported as "no results".
    pub async fn search(&self, query: &str, k: usize) -> Vec<SearchResult> {
        match self.try_search(query, k).await {
            Ok(results) => results,
            Err(e) if e.is_cold() => {
                tracing::warn!(error = %e, "no index found, run `crag ingest` first");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "search failed");
                Vec::new()
            }
        }
    }

    /// Drop the cached index; the next search reloads it from disk.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// The cached index, loading it from disk on first use.
    ///
    /// A failed load is not cached.
    pub async fn loaded(&self) -> Result<Arc<StoredIndex>> {
        if let Some(hit) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(hit));
        }

        let mut slot = self.cache.write().await;
        if let Some(hit) = slot.as_ref() {
            return Ok(Arc::clone(hit));
        }

        let stored = Arc::new(self.store.load()?);
        let model = self.embedder.model_name();
        if stored.manifest.model != model {
            tracing::warn!(
                index_model = %stored.manifest.model,
                query_model = %model,
                "index was built with a different embedding model; scores may be meaningless"
            );
        }
        tracing::info!(
            chunks = stored.corpus.len(),
            dims = stored.corpus.dims(),
            "loaded index"
        );
        *slot = Some(Arc::clone(&stored));
        Ok(stored)
    }
}

/// Engine over the configured embedding provider and index directory.
pub fn open_engine(config: &Config) -> anyhow::Result<Arc<RetrievalEngine>> {
    let embedder = create_embedder(&config.embedding)?;
    Ok(Arc::new(RetrievalEngine::from_config(config, embedder)))
}
