//! Flat (exhaustive) L2 vector index.
//!
//! [`FlatIndex`] stores vectors contiguously in insertion order and answers
//! k-nearest-neighbour queries by comparing the query against every stored
//! vector. Search is `O(n × D)` per query, which is fine for corpora of a
//! few thousand chunks.
//!
//! Position `i` in the index always corresponds to chunk `i` of the
//! ingestion run that built it. Insertion is append-only.
//!
//! # Byte format
//!
//! ```text
//! offset  size        field
//! 0       8           magic  b"CRAGFLAT"
//! 8       4           format version (u32 LE, currently 1)
//! 12      4           metric (u32 LE, 0 = L2)
//! 16      4           dims (u32 LE)
//! 20      8           count (u64 LE)
//! 28      count×dims×4 vectors, f32 LE, row-major
//! ```

use crate::embedding::{blob_to_vec, l2_distance, vec_to_blob};
use crate::error::{RagError, Result};

const MAGIC: &[u8; 8] = b"CRAGFLAT";
const FORMAT_VERSION: u32 = 1;
const METRIC_L2: u32 = 0;
const HEADER_LEN: usize = 28;

/// A search hit: index position and L2 distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Exhaustive L2 index over fixed-dimension `f32` vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dims: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of length `dims`.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            data: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The vector stored at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dims;
        Some(&self.data[start..start + self.dims])
    }

    /// Append `vectors` in order.
    ///
    /// Every vector is checked before any is stored, so a dimension
    /// mismatch leaves the index unchanged.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dims) {
            return Err(RagError::DimensionMismatch {
                expected: self.dims,
                actual: bad.len(),
            });
        }
        self.data.reserve(vectors.len() * self.dims);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    /// Return the `k` nearest stored vectors to `query`.
    ///
    /// Results are sorted by ascending distance; equal distances keep
    /// insertion order. The result holds `min(k, len)` entries, so `k = 0`
    /// or an empty index yields an empty list.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(RagError::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dims)
            .enumerate()
            .map(|(position, v)| Neighbor {
                position,
                distance: l2_distance(query, v),
            })
            .collect();

        // Stable sort: ties stay in position order
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    /// Serialise the index to its on-disk byte format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&METRIC_L2.to_le_bytes());
        out.extend_from_slice(&(self.dims as u32).to_le_bytes());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        out.extend_from_slice(&vec_to_blob(&self.data));
        out
    }

    /// Parse an index previously written by [`to_bytes`](Self::to_bytes).
    ///
    /// Fails with [`RagError::ArtifactCorrupt`] on a bad header, an unknown
    /// version or metric, or a payload whose length disagrees with the
    /// header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(RagError::corrupt(format!(
                "index is {} bytes, shorter than its header",
                bytes.len()
            )));
        }
        if &bytes[..8] != MAGIC {
            return Err(RagError::corrupt("index has an unknown magic number"));
        }

        let version = read_u32(bytes, 8);
        if version != FORMAT_VERSION {
            return Err(RagError::corrupt(format!(
                "unsupported index format version {}",
                version
            )));
        }
        let metric = read_u32(bytes, 12);
        if metric != METRIC_L2 {
            return Err(RagError::corrupt(format!("unsupported metric id {}", metric)));
        }

        let dims = read_u32(bytes, 16) as usize;
        let count = read_u64(bytes, 20) as usize;
        let payload = &bytes[HEADER_LEN..];

        let expected = count
            .checked_mul(dims)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| RagError::corrupt("index header overflows"))?;
        if payload.len() != expected {
            return Err(RagError::corrupt(format!(
                "index payload is {} bytes, header declares {} vectors of {} dims",
                payload.len(),
                count,
                dims
            )));
        }
        if dims == 0 && count > 0 {
            return Err(RagError::corrupt("index declares vectors with zero dims"));
        }

        Ok(Self {
            dims,
            data: blob_to_vec(payload),
        })
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}
