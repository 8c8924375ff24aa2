//! Ranking over a [`FlatIndex`] paired with its chunk metadata.
//!
//! [`CorpusIndex`] keeps the vector index and the chunk list side by side
//! and enforces the invariant that position `i` in the index is chunk `i`.
//! Query-time search maps L2 distances to similarities with
//! [`similarity_from_distance`] and joins each hit with its chunk.

use crate::error::{RagError, Result};
use crate::index::FlatIndex;
use crate::models::{Chunk, EmbeddedChunk, SearchResult};

/// Map an L2 distance to a similarity score in `(0, 1]`.
///
/// `similarity = 1 / (1 + distance)`: identical vectors score `1.0` and the
/// score strictly decreases as distance grows.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// A vector index together with the chunks it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusIndex {
    index: FlatIndex,
    chunks: Vec<Chunk>,
}

impl CorpusIndex {
    /// Pair an index with its chunks.
    ///
    /// Fails with [`RagError::ArtifactCorrupt`] when `chunks.len()` differs
    /// from the number of indexed vectors.
    pub fn new(index: FlatIndex, chunks: Vec<Chunk>) -> Result<Self> {
        if index.len() != chunks.len() {
            return Err(RagError::corrupt(format!(
                "index holds {} vectors but there are {} chunks",
                index.len(),
                chunks.len()
            )));
        }
        Ok(Self { index, chunks })
    }

    /// Build from embedded chunks, in the order given.
    ///
    /// The dimension is fixed by the first embedding; any later embedding
    /// of another length fails with [`RagError::DimensionMismatch`]. A
    /// zero-length first embedding is a [`RagError::Provider`] failure.
    pub fn build(embedded: Vec<EmbeddedChunk>) -> Result<Self> {
        let dims = embedded.first().map(|e| e.embedding.len()).unwrap_or(0);
        if dims == 0 && !embedded.is_empty() {
            return Err(RagError::provider("embedding service returned empty vectors"));
        }
        let mut index = FlatIndex::new(dims);
        let (chunks, vectors): (Vec<Chunk>, Vec<Vec<f32>>) = embedded
            .into_iter()
            .map(|e| (e.chunk, e.embedding))
            .unzip();
        index.add(&vectors)?;
        Self::new(index, chunks)
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn dims(&self) -> usize {
        self.index.dims()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Rank chunks against an embedded query, most similar first.
    ///
    /// Distances ascend, so similarities already descend and no extra
    /// sort is needed.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let hits = self.index.search(query_vec, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.chunks.get(hit.position).map(|chunk| SearchResult {
                    chunk_id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    similarity: similarity_from_distance(hit.distance),
                    distance: hit.distance,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_text;

    fn embedded(texts: &[&str]) -> Vec<EmbeddedChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| EmbeddedChunk {
                chunk: Chunk {
                    id: (i + 1).to_string(),
                    text: t.to_string(),
                    hash: String::new(),
                },
                embedding: vec![t.chars().count() as f32],
            })
            .collect()
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert!((similarity_from_distance(1.0) - 0.5).abs() < 1e-6);
        let far = similarity_from_distance(1e6);
        assert!(far > 0.0 && far < 1e-5);
        assert!(similarity_from_distance(2.0) < similarity_from_distance(1.0));
    }

    #[test]
    fn test_char_count_embedding_ranks_bb_first() {
        let corpus = CorpusIndex::build(embedded(&["a", "bb", "ccc"])).unwrap();
        let results = corpus.search(&[2.0], 3).unwrap();
        assert_eq!(results[0].text, "bb");
        assert_eq!(results[0].chunk_id, "2");
        assert_eq!(results[0].similarity, 1.0);
        assert!(results
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn test_build_rejects_mixed_dims() {
        let mut items = embedded(&["a", "bb"]);
        items[1].embedding = vec![1.0, 2.0];
        assert!(matches!(
            CorpusIndex::build(items),
            Err(RagError::DimensionMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_count_invariant() {
        let mut index = FlatIndex::new(1);
        index.add(&[vec![1.0]]).unwrap();
        let chunks = chunk_text("abcdef", 3);
        assert!(matches!(
            CorpusIndex::new(index, chunks),
            Err(RagError::ArtifactCorrupt(_))
        ));
    }

    #[test]
    fn test_k_larger_than_corpus() {
        let corpus = CorpusIndex::build(embedded(&["a", "bb"])).unwrap();
        assert_eq!(corpus.search(&[1.0], 10).unwrap().len(), 2);
        assert!(corpus.search(&[1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_build_rejects_empty_embeddings() {
        let mut items = embedded(&["a", "bb"]);
        for item in &mut items {
            item.embedding.clear();
        }
        assert!(matches!(
            CorpusIndex::build(items),
            Err(RagError::Provider(_))
        ));
        assert!(CorpusIndex::build(Vec::new()).unwrap().is_empty());
    }
}
