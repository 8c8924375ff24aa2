//! On-disk persistence for the vector index and its chunk metadata.
//!
//! An index generation is stored as two files under `[index].dir`:
//!
//! | File | Contents |
//! |------|----------|
//! | `index.bin` | [`FlatIndex`] byte format (vectors only) |
//! | `chunks.json` | [`Manifest`] header plus `{id, text, hash}` chunk records |
//!
//! Embeddings live only in `index.bin`; the chunk file never repeats them.
//!
//! Each file is written to a `.tmp` sibling and renamed into place, so a
//! single file is never observed half-written. The pair is NOT written
//! transactionally: `index.bin` is replaced first, then `chunks.json`, and a
//! crash in between leaves a new index next to old chunks. [`IndexStore::load`]
//! reports that state as [`RagError::ArtifactCorrupt`] when the counts
//! disagree; re-running ingestion repairs it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use corpus_rag_core::index::FlatIndex;
use corpus_rag_core::models::Chunk;
use corpus_rag_core::search::CorpusIndex;
use corpus_rag_core::{RagError, Result};
use serde::{Deserialize, Serialize};

pub const INDEX_FILE: &str = "index.bin";
pub const CHUNKS_FILE: &str = "chunks.json";

const MANIFEST_VERSION: u32 = 1;

/// Metadata describing one index generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Embedding model the vectors were produced with.
    pub model: String,
    pub dims: usize,
    /// SHA-256 of the whole corpus text.
    pub corpus_hash: String,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new(model: &str, corpus_hash: String, corpus: &CorpusIndex) -> Self {
        Self {
            version: MANIFEST_VERSION,
            model: model.to_string(),
            dims: corpus.dims(),
            corpus_hash,
            chunk_count: corpus.len(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ChunksFile {
    #[serde(flatten)]
    manifest: Manifest,
    chunks: Vec<Chunk>,
}

/// A loaded index generation.
#[derive(Debug, Clone)]
pub struct StoredIndex {
    pub manifest: Manifest,
    pub corpus: CorpusIndex,
}

/// Reads and writes the artifact pair under one directory.
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn chunks_path(&self) -> PathBuf {
        self.dir.join(CHUNKS_FILE)
    }

    /// True when both artifact files are present.
    pub fn exists(&self) -> bool {
        self.index_path().is_file() && self.chunks_path().is_file()
    }

    /// Write both artifacts, replacing any previous generation.
    pub fn save(&self, corpus: &CorpusIndex, manifest: &Manifest) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let index_bytes = corpus.index().to_bytes();
        let chunks_file = ChunksFile {
            manifest: manifest.clone(),
            chunks: corpus.chunks().to_vec(),
        };
        let chunk_bytes = serde_json::to_vec(&chunks_file)
            .map_err(|e| RagError::corrupt(format!("failed to encode chunks: {}", e)))?;

        write_replace(&self.index_path(), &index_bytes)?;
        write_replace(&self.chunks_path(), &chunk_bytes)?;

        tracing::debug!(
            dir = %self.dir.display(),
            chunks = corpus.len(),
            index_bytes = index_bytes.len(),
            "saved index artifacts"
        );
        Ok(())
    }

    /// Read both artifacts back.
    ///
    /// Fails with [`RagError::ArtifactNotFound`] if either file is missing
    /// and [`RagError::ArtifactCorrupt`] if either cannot be decoded or the
    /// chunk count differs from the vector count.
    pub fn load(&self) -> Result<StoredIndex> {
        let index_bytes = read_artifact(&self.index_path())?;
        let chunk_bytes = read_artifact(&self.chunks_path())?;

        let index = FlatIndex::from_bytes(&index_bytes)?;
        let chunks_file = decode_chunks(&chunk_bytes)?;
        let manifest = chunks_file.manifest;

        if manifest.chunk_count != chunks_file.chunks.len() {
            return Err(RagError::corrupt(format!(
                "{} declares {} chunks but holds {}",
                CHUNKS_FILE,
                manifest.chunk_count,
                chunks_file.chunks.len()
            )));
        }
        if !index.is_empty() && manifest.dims != index.dims() {
            return Err(RagError::corrupt(format!(
                "{} declares {} dims but {} has {}",
                CHUNKS_FILE,
                manifest.dims,
                INDEX_FILE,
                index.dims()
            )));
        }

        let corpus = CorpusIndex::new(index, chunks_file.chunks)?;
        Ok(StoredIndex { manifest, corpus })
    }

    /// On-disk size of both artifacts, in bytes.
    pub fn size_on_disk(&self) -> u64 {
        [self.index_path(), self.chunks_path()]
            .iter()
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }
}

fn decode_chunks(bytes: &[u8]) -> Result<ChunksFile> {
    let file: ChunksFile = serde_json::from_slice(bytes)
        .map_err(|e| RagError::corrupt(format!("{} is unreadable: {}", CHUNKS_FILE, e)))?;
    if file.manifest.version != MANIFEST_VERSION {
        return Err(RagError::corrupt(format!(
            "unsupported {} version {}",
            CHUNKS_FILE, file.manifest.version
        )));
    }
    Ok(file)
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(RagError::ArtifactNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

fn write_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let written = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
