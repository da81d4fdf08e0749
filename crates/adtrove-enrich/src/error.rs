use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vision API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("vision API response parse error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("vision API returned no description for model {model}")]
    EmptyDescription { model: String },

    #[error("description timed out after {secs}s")]
    Timeout { secs: u64 },
}
