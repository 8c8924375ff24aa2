//! Ingestion progress reporting.
//!
//! Reports observable progress during `crag ingest` so users see how many
//! chunks were produced and how far embedding has got. Progress is emitted
//! on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event emitted by the ingestion pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestEvent {
    /// The corpus was split into `chunks` pieces.
    Chunked { chunks: u64 },
    /// `done` of `total` chunks have embeddings.
    Embedding { done: u64, total: u64 },
    /// Artifacts are being written to `dir`.
    Writing { dir: String },
    /// Ingestion finished.
    Done { chunks: u64, dims: u64 },
}

/// Receives progress events. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Human-friendly progress on stderr: "ingest  embedding  1,234 / 5,000 chunks".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: IngestEvent) {
        let line = match &event {
            IngestEvent::Chunked { chunks } => {
                format!("ingest  chunked into {} chunks\n", format_number(*chunks))
            }
            IngestEvent::Embedding { done, total } => format!(
                "ingest  embedding  {} / {} chunks\n",
                format_number(*done),
                format_number(*total)
            ),
            IngestEvent::Writing { dir } => format!("ingest  writing index to {}\n", dir),
            IngestEvent::Done { chunks, dims } => format!(
                "ingest  done  {} chunks, {} dims\n",
                format_number(*chunks),
                dims
            ),
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: IngestEvent) {
        let obj = match &event {
            IngestEvent::Chunked { chunks } => serde_json::json!({
                "event": "progress",
                "phase": "chunked",
                "chunks": chunks
            }),
            IngestEvent::Embedding { done, total } => serde_json::json!({
                "event": "progress",
                "phase": "embedding",
                "n": done,
                "total": total
            }),
            IngestEvent::Writing { dir } => serde_json::json!({
                "event": "progress",
                "phase": "writing",
                "dir": dir
            }),
            IngestEvent::Done { chunks, dims } => serde_json::json!({
                "event": "done",
                "chunks": chunks,
                "dims": dims
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: IngestEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
