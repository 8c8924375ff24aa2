//! Data types that flow through ingestion and retrieval.

use serde::{Deserialize, Serialize};

/// A bounded, order-preserving slice of the source corpus.
///
/// `id` is the 1-based position of the chunk within one index generation.
/// `hash` is the SHA-256 of `text`, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub hash: String,
}

/// A chunk together with the embedding computed for it during ingestion.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// One ranked hit returned by a query. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub text: String,
    /// `1 / (1 + distance)`, always in `(0, 1]`.
    pub similarity: f32,
    /// Raw L2 distance between query and chunk embedding.
    pub distance: f32,
}
