//! Text generation provider trait.
//!
//! A [`Generator`] takes an ordered list of chat messages and returns the
//! model's reply. Concrete providers live in the `corpus-rag` app crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single message in a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for text generation providers.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4.1"`).
    fn model_name(&self) -> &str;

    /// Produce a reply for `messages`.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}
