//! JSON-over-HTTP client shared by the embedding and generation providers.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Every failure is reported as [`RagError::Provider`].

use std::time::Duration;

use corpus_rag_core::RagError;
use serde_json::Value;

pub struct JsonClient {
    client: reqwest::Client,
    max_retries: u32,
    /// Service name used in error messages (e.g. `"OpenAI"`).
    label: &'static str,
}

impl JsonClient {
    pub fn new(label: &'static str, timeout_secs: u64, max_retries: u32) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RagError::provider(format!("{} client setup failed: {}", label, e)))?;
        Ok(Self {
            client,
            max_retries,
            label,
        })
    }

    /// POST `body` to `url` and return the decoded JSON response.
    pub async fn post(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<Value, RagError> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(
                    service = self.label,
                    attempt,
                    delay_secs = delay.as_secs(),
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .json(body);
            if let Some(key) = bearer {
                request = request.header("Authorization", format!("Bearer {}", key));
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.json::<Value>().await.map_err(|e| {
                            RagError::provider(format!(
                                "{} returned malformed JSON: {}",
                                self.label, e
                            ))
                        });
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = RagError::provider(format!(
                        "{} API error {}: {}",
                        self.label, status, body_text
                    ));

                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(service = self.label, %status, "transient API error");
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    tracing::warn!(service = self.label, error = %e, "request failed");
                    last_err = Some(RagError::provider(format!(
                        "{} request to {} failed: {}",
                        self.label, url, e
                    )));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            RagError::provider(format!("{} request failed after retries", self.label))
        }))
    }
}

/// Read an API key from the environment variable `var`.
pub fn api_key_from_env(var: &str) -> Result<String, RagError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(RagError::provider(format!(
            "{} environment variable not set",
            var
        ))),
    }
}

/// Join a base URL and a path without doubling the slash.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
