//! Embedding provider implementations.
//!
//! Concrete [`Embedder`]s selected by `[embedding].provider`:
//! - **[`DisabledEmbedder`]**: returns errors; used when embeddings are not configured.
//! - **[`OpenAIEmbedder`]**: calls the OpenAI-compatible `/embeddings` endpoint.
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalEmbedder`**: fastembed inference, behind the `local-embeddings` feature.
//!
//! Providers pass every input through
//! [`normalize_input`] before sending it, whether or not the caller already
//! did. Each returned vector is checked against the configured dimension.
//!
//! # Provider Selection
//!
//! ```rust
//! # use corpus_rag::config::EmbeddingConfig;
//! # use corpus_rag::embedding::create_embedder;
//! # use corpus_rag_core::embedding::{normalize_input, Embedder};
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```

#[cfg(feature = "local-embeddings")]
mod local;

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use corpus_rag_core::embedding::{normalize_input, Embedder};
use corpus_rag_core::RagError;
use serde_json::Value;

use crate::config::EmbeddingConfig;
use crate::http::{api_key_from_env, endpoint, JsonClient};

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

// ============ Disabled Provider ============

/// An embedder that always fails.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> corpus_rag_core::Result<Vec<Vec<f32>>> {
        Err(RagError::provider(
            "Embedding provider is disabled. Set [embedding] provider in config.",
        ))
    }
}

// ============ OpenAI Provider ============

/// Embedder backed by the OpenAI embeddings API.
///
/// The API key is read once, at construction, from the environment
/// variable named by `embedding.api_key_env`.
pub struct OpenAIEmbedder {
    client: JsonClient,
    api_key: String,
    url: String,
    model: String,
    dims: usize,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = require_model_and_dims(config, "OpenAI")?;
        let api_key = api_key_from_env(&config.api_key_env)?;
        Ok(Self {
            client: JsonClient::new("OpenAI", config.timeout_secs, config.max_retries)?,
            api_key,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
            model,
            dims,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> corpus_rag_core::Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": request_inputs(texts),
        });
        let json = self
            .client
            .post(&endpoint(&self.url, "embeddings"), Some(&self.api_key), &body)
            .await?;
        let vectors = parse_openai_response(&json)?;
        check_shape(vectors, texts.len(), self.dims)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &Value) -> corpus_rag_core::Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| RagError::provider("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| RagError::provider("Invalid OpenAI response: missing embedding"))?;
        indexed.push((index, parse_vector(embedding)?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedder backed by a local Ollama instance (`POST /api/embed`).
pub struct OllamaEmbedder {
    client: JsonClient,
    url: String,
    model: String,
    dims: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = require_model_and_dims(config, "Ollama")?;
        Ok(Self {
            client: JsonClient::new("Ollama", config.timeout_secs, config.max_retries)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            model,
            dims,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> corpus_rag_core::Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": request_inputs(texts),
        });
        let json = self
            .client
            .post(&endpoint(&self.url, "api/embed"), None, &body)
            .await?;
        let vectors = parse_ollama_response(&json)?;
        check_shape(vectors, texts.len(), self.dims)
    }
}

fn parse_ollama_response(json: &Value) -> corpus_rag_core::Result<Vec<Vec<f32>>> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| RagError::provider("Invalid Ollama response: missing embeddings array"))?
        .iter()
        .map(parse_vector)
        .collect()
}

// ============ Shared helpers ============

/// Inputs as sent over the wire: newlines collapsed to spaces.
fn request_inputs(texts: &[String]) -> Vec<String> {
    texts.iter().map(|t| normalize_input(t)).collect()
}

fn require_model_and_dims(config: &EmbeddingConfig, label: &str) -> Result<(String, usize)> {
    let model = config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("embedding.model required for {} provider", label))?;
    let dims = config
        .dims
        .ok_or_else(|| anyhow::anyhow!("embedding.dims required for {} provider", label))?;
    Ok((model, dims))
}

fn parse_vector(value: &Value) -> corpus_rag_core::Result<Vec<f32>> {
    value
        .as_array()
        .ok_or_else(|| RagError::provider("Invalid embedding response: vector is not an array"))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| RagError::provider("Invalid embedding response: non-numeric value"))
        })
        .collect()
}

/// One vector per input, each of the expected length (when known).
fn check_shape(
    vectors: Vec<Vec<f32>>,
    expected_count: usize,
    dims: usize,
) -> corpus_rag_core::Result<Vec<Vec<f32>>> {
    if vectors.len() != expected_count {
        return Err(RagError::provider(format!(
            "embedding response has {} vectors for {} inputs",
            vectors.len(),
            expected_count
        )));
    }
    if dims > 0 {
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(RagError::DimensionMismatch {
                expected: dims,
                actual: bad.len(),
            });
        }
    }
    Ok(vectors)
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` (requires the `local-embeddings` feature) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
