//! `crag ingest`: build the index from a corpus file.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::engine::{open_engine, IngestReport, RetrievalEngine};
use crate::progress::ProgressMode;

pub async fn run_ingest(config: &Config, path: &Path, progress: ProgressMode) -> Result<()> {
    let engine = open_engine(config)?;
    let report = ingest_file(&engine, path, progress).await?;

    println!("ingest {}", path.display());
    println!("  chunks: {}", report.chunks);
    println!("  dims: {}", report.dims);
    println!("  model: {}", report.model);
    println!("  corpus hash: {}", short_hash(&report.corpus_hash));
    println!("  index: {}", engine.store().dir().display());
    println!("  elapsed: {:.2}s", report.elapsed_secs);
    println!("ok");
    Ok(())
}

/// Read `path` wholesale and rebuild the index from it.
pub async fn ingest_file(
    engine: &RetrievalEngine,
    path: &Path,
    progress: ProgressMode,
) -> Result<IngestReport> {
    let corpus = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

    let reporter = progress.reporter();
    let report = engine
        .ingest_with_progress(&corpus, reporter.as_ref())
        .await
        .with_context(|| format!("Ingestion of {} failed", path.display()))?;
    Ok(report)
}

pub(crate) fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
