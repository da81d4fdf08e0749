use std::net::SocketAddr;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Only the server and `db` commands need a database; `collect` talks HTTP.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub browserless_url: String,
    pub browserless_token: Option<String>,
    pub library_url: String,
    pub page_timeout_secs: u64,
    pub collect_max_passes: usize,
    pub collect_stagnant_rounds: usize,
    pub collect_settle_delay_ms: u64,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    pub ingest_url: String,
    pub ingest_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_vision_model: String,
    pub enrich_timeout_secs: u64,
    pub enrich_concurrency: usize,
}

impl AppConfig {
    /// Returns the configured database URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("browserless_url", &self.browserless_url)
            .field(
                "browserless_token",
                &self.browserless_token.as_ref().map(|_| "[redacted]"),
            )
            .field("library_url", &self.library_url)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("collect_max_passes", &self.collect_max_passes)
            .field("collect_stagnant_rounds", &self.collect_stagnant_rounds)
            .field("collect_settle_delay_ms", &self.collect_settle_delay_ms)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .field("ingest_url", &self.ingest_url)
            .field(
                "ingest_api_key",
                &self.ingest_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_vision_model", &self.openai_vision_model)
            .field("enrich_timeout_secs", &self.enrich_timeout_secs)
            .field("enrich_concurrency", &self.enrich_concurrency)
            .finish()
    }
}
