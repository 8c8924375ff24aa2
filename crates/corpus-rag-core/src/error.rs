//! Error taxonomy for the retrieval pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// Embedding or generation service failure: network, auth, rate limit,
    /// or a response that could not be understood.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("index artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("corpus is empty, nothing to ingest")]
    EmptyCorpus,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn provider(msg: impl Into<String>) -> Self {
        RagError::Provider(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        RagError::ArtifactCorrupt(msg.into())
    }

    /// True when the persisted index simply has not been built yet.
    pub fn is_cold(&self) -> bool {
        matches!(self, RagError::ArtifactNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
