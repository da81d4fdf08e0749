use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {endpoint} (retry after {retry_after_secs}s)")]
    RateLimited {
        endpoint: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("invalid browser endpoint \"{url}\": {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("page session failed: {0}")]
    Session(String),

    /// The first extraction pass could not be produced.
    #[error("collection timed out after {passes} passes: {reason}")]
    CollectionTimeout { passes: usize, reason: String },
}
