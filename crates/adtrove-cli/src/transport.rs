//! Delivery of batch payloads to the ingestion service.

use std::time::Duration;

use adtrove_core::{BatchPayload, BatchResult};
use async_trait::async_trait;

const BATCH_PATH: &str = "/api/v1/ads/batch";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ingestion service rejected the batch with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to parse ingestion response: {source}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
    },
}

/// Sends one batch to storage and reports what was processed.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    async fn send(&self, payload: &BatchPayload) -> Result<BatchResult, TransportError>;
}

/// Posts batches to `{base_url}/api/v1/ads/batch`.
pub struct HttpBatchTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpBatchTransport {
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("adtrove-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{BATCH_PATH}", base_url.trim_end_matches('/')),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &adtrove_core::AppConfig) -> Result<Self, TransportError> {
        Self::new(
            &config.ingest_url,
            config.ingest_api_key.clone(),
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BatchTransport for HttpBatchTransport {
    async fn send(&self, payload: &BatchPayload) -> Result<BatchResult, TransportError> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| TransportError::Deserialize { source })
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
