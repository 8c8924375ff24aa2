//! TOML configuration.
//!
//! ```toml
//! [index]
//! dir = "./data/index"
//!
//! [chunking]
//! max_chars = 10000
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [generation]
//! provider = "openai"
//! model = "gpt-4.1"
//!
//! [retrieval]
//! search_k = 3
//! answer_k = 5
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Directory holding `index.bin` and `chunks.json`.
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (OpenAI-compatible API root or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Texts per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Requests in flight at once during ingestion.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            api_key_env: default_api_key_env(),
            max_retries: default_max_retries(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Results shown for a plain search.
    #[serde(default = "default_search_k")]
    pub search_k: usize,
    /// Chunks fed to the generator as context.
    #[serde(default = "default_answer_k")]
    pub answer_k: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Ask before printing a result's full text in the session.
    #[serde(default = "default_true")]
    pub confirm_full_text: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_k: default_search_k(),
            answer_k: default_answer_k(),
            preview_chars: default_preview_chars(),
            confirm_full_text: true,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_batch_size() -> usize {
    16
}
fn default_concurrency() -> usize {
    4
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}
fn default_generation_timeout_secs() -> u64 {
    120
}
fn default_search_k() -> usize {
    3
}
fn default_answer_k() -> usize {
    5
}
fn default_preview_chars() -> usize {
    300
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Check value ranges and provider settings.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chars == 0 {
            bail!("chunking.max_chars must be > 0");
        }
        if self.retrieval.search_k == 0 {
            bail!("retrieval.search_k must be >= 1");
        }
        if self.retrieval.answer_k == 0 {
            bail!("retrieval.answer_k must be >= 1");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be >= 1");
        }
        if self.embedding.concurrency == 0 {
            bail!("embedding.concurrency must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "local" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                other
            ),
        }
        if self.embedding.is_enabled() && self.embedding.provider != "local" {
            if self.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.dims.unwrap_or(0) == 0 {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
        }

        match self.generation.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }
        if self.generation.is_enabled() && self.generation.model.is_none() {
            bail!(
                "generation.model must be specified when provider is '{}'",
                self.generation.provider
            );
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Config {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = parse("[index]\ndir = \"/tmp/idx\"\n");
        assert_eq!(cfg.chunking.max_chars, 10_000);
        assert_eq!(cfg.retrieval.search_k, 3);
        assert_eq!(cfg.retrieval.answer_k, 5);
        assert_eq!(cfg.retrieval.preview_chars, 300);
        assert!(cfg.retrieval.confirm_full_text);
        assert!(!cfg.embedding.is_enabled());
        assert!(!cfg.generation.is_enabled());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_openai_requires_model_and_dims() {
        let cfg = parse("[index]\ndir = \"x\"\n[embedding]\nprovider = \"openai\"\n");
        assert!(cfg.validate().is_err());

        let cfg = parse(
            "[index]\ndir = \"x\"\n[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n",
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let cfg = parse("[index]\ndir = \"x\"\n[generation]\nprovider = \"bard\"\n");
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("bard"));
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let cfg = parse("[index]\ndir = \"x\"\n[chunking]\nmax_chars = 0\n");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_generation_requires_model() {
        let cfg = parse("[index]\ndir = \"x\"\n[generation]\nprovider = \"ollama\"\n");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_example_config_is_valid() {
        let cfg = parse(include_str!("../config/crag.example.toml"));
        cfg.validate().unwrap();
        assert_eq!(cfg.embedding.provider, "openai");
        assert_eq!(cfg.embedding.dims, Some(1536));
        assert_eq!(cfg.generation.timeout_secs, 120);
    }
}
