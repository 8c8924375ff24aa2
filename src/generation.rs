//! Text generation provider implementations.
//!
//! Concrete [`Generator`]s selected by `[generation].provider`:
//! - **[`DisabledGenerator`]**: returns errors.
//! - **[`OpenAIGenerator`]**: `POST /chat/completions` on an OpenAI-compatible API.
//! - **[`OllamaGenerator`]**: `POST /api/chat` on a local Ollama instance.
//!
//! Both network providers share the retry policy documented in
//! [`crate::http`].

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use corpus_rag_core::generation::{ChatMessage, Generator};
use corpus_rag_core::RagError;
use serde_json::Value;

use crate::config::GenerationConfig;
use crate::http::{api_key_from_env, endpoint, JsonClient};

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _messages: &[ChatMessage]) -> corpus_rag_core::Result<String> {
        Err(RagError::provider(
            "Generation provider is disabled. Set [generation] provider in config.",
        ))
    }
}

/// Generator backed by the OpenAI chat completions API.
pub struct OpenAIGenerator {
    client: JsonClient,
    api_key: String,
    url: String,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;
        let api_key = api_key_from_env(&config.api_key_env)?;
        Ok(Self {
            client: JsonClient::new("OpenAI", config.timeout_secs, config.max_retries)?,
            api_key,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
            model,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn generate(&self, messages: &[ChatMessage]) -> corpus_rag_core::Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });
        let json = self
            .client
            .post(
                &endpoint(&self.url, "chat/completions"),
                Some(&self.api_key),
                &body,
            )
            .await?;
        parse_openai_reply(&json)
    }
}

fn parse_openai_reply(json: &Value) -> corpus_rag_core::Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| RagError::provider("Invalid OpenAI response: missing choices[0].message.content"))
}

/// Generator backed by a local Ollama instance.
pub struct OllamaGenerator {
    client: JsonClient,
    url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;
        Ok(Self {
            client: JsonClient::new("Ollama", config.timeout_secs, config.max_retries)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            model,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn generate(&self, messages: &[ChatMessage]) -> corpus_rag_core::Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });
        let json = self
            .client
            .post(&endpoint(&self.url, "api/chat"), None, &body)
            .await?;
        parse_ollama_reply(&json)
    }
}

fn parse_ollama_reply(json: &Value) -> corpus_rag_core::Result<String> {
    json.pointer("/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| RagError::provider("Invalid Ollama response: missing message.content"))
}

/// Create the [`Generator`] named by `config.provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
