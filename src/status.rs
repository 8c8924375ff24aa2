//! `crag status`: what is indexed and where.

use anyhow::Result;
use corpus_rag_core::RagError;

use crate::config::Config;
use crate::ingest::short_hash;
use crate::store::{IndexStore, Manifest};

/// Artifact state as seen from disk.
#[derive(Debug)]
pub enum IndexState {
    /// No artifacts yet.
    Cold,
    Ready(Manifest),
    Corrupt(String),
}

/// Inspect the artifacts by loading them exactly as a search would.
pub fn index_state(store: &IndexStore) -> IndexState {
    match store.load() {
        Ok(stored) => IndexState::Ready(stored.manifest),
        Err(RagError::ArtifactNotFound(_)) => IndexState::Cold,
        Err(e) => IndexState::Corrupt(e.to_string()),
    }
}

pub fn run_status(config: &Config) -> Result<()> {
    let store = IndexStore::new(&config.index.dir);

    println!("corpus-rag index status");
    println!("=======================");
    println!();
    println!("  Directory:   {}", store.dir().display());

    match index_state(&store) {
        IndexState::Cold => {
            println!("  State:       cold (run `crag ingest <file>`)");
        }
        IndexState::Corrupt(reason) => {
            println!("  State:       corrupt");
            println!("  Error:       {}", reason);
        }
        IndexState::Ready(manifest) => {
            println!("  State:       ready");
            println!("  Size:        {}", format_bytes(store.size_on_disk()));
            println!();
            println!("  Model:       {}", manifest.model);
            println!("  Dimensions:  {}", manifest.dims);
            println!("  Chunks:      {}", manifest.chunk_count);
            println!("  Corpus hash: {}", short_hash(&manifest.corpus_hash));
            println!(
                "  Created:     {}",
                manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );

            if let Some(model) = config.embedding.model.as_deref() {
                if model != manifest.model {
                    println!();
                    println!(
                        "  warning: configured model '{}' differs from index model '{}'; re-ingest before searching",
                        model, manifest.model
                    );
                }
            }
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_rag_core::chunk::chunk_text;
    use corpus_rag_core::index::FlatIndex;
    use corpus_rag_core::models::EmbeddedChunk;
    use corpus_rag_core::search::CorpusIndex;

    /// A valid three-chunk index pair under `dir`.
    fn saved_store(dir: &std::path::Path) -> IndexStore {
        let embedded = chunk_text("hello world", 5)
            .into_iter()
            .map(|chunk| EmbeddedChunk {
                embedding: vec![chunk.text.len() as f32],
                chunk,
            })
            .collect();
        let corpus = CorpusIndex::build(embedded).unwrap();
        let manifest = Manifest::new("char-count", "abc123".to_string(), &corpus);
        let store = IndexStore::new(dir);
        store.save(&corpus, &manifest).unwrap();
        store
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_cold_state() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path().join("index"));
        assert!(matches!(index_state(&store), IndexState::Cold));
    }

    #[test]
    fn test_corrupt_state() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path());
        std::fs::write(store.index_path(), b"junk").unwrap();
        std::fs::write(store.chunks_path(), b"not json").unwrap();
        assert!(matches!(index_state(&store), IndexState::Corrupt(_)));
    }

    #[test]
    fn test_ready_state() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = saved_store(tmp.path());
        match index_state(&store) {
            IndexState::Ready(manifest) => assert_eq!(manifest.chunk_count, 3),
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_index_shorter_than_chunks_is_corrupt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = saved_store(tmp.path());

        // chunks.json stays valid; index.bin holds one vector instead of three
        let mut short = FlatIndex::new(1);
        short.add(&[vec![5.0]]).unwrap();
        std::fs::write(store.index_path(), short.to_bytes()).unwrap();

        assert!(matches!(index_state(&store), IndexState::Corrupt(_)));
    }

    #[test]
    fn test_garbage_index_next_to_valid_chunks_is_corrupt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = saved_store(tmp.path());
        std::fs::write(store.index_path(), b"garbage").unwrap();

        assert!(matches!(index_state(&store), IndexState::Corrupt(_)));
    }
}
