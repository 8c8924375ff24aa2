//! Embedding provider trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus pure helpers for input normalisation, vector serialisation, and
//! distance computation.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the
//! `corpus-rag` app crate.

use async_trait::async_trait;

use crate::error::Result;

/// Trait for embedding providers.
///
/// `embed` returns one vector per input, in input order. Failures of the
/// underlying service surface as [`RagError::Provider`](crate::RagError::Provider).
///
/// Text sent to an embedding service must first pass through
/// [`normalize_input`]. The engine normalizes before every call, and the
/// bundled providers normalize again on their side, so either entry point
/// is safe. `normalize_input` is idempotent.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding dimensionality, or `0` when the provider
    /// does not know it in advance.
    fn dims(&self) -> usize;

    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Prepare text for an embedding request.
///
/// Embedding services score formatting-only differences, so embedded
/// newlines (including `\r\n`) are collapsed to single spaces.
pub fn normalize_input(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(|c: char| c == '\n' || c == '\r', " ")
}

/// Euclidean (L2) distance between two vectors of equal length.
///
/// Callers are responsible for checking the lengths; extra trailing
/// components of the longer vector are ignored.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Encode a float vector as little-endian `f32` bytes.
///
/// # Example
///
/// ```rust
/// use corpus_rag_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian `f32` bytes back into a vector.
///
/// Trailing bytes that do not form a full `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
