//! Shared configuration, wire types, and batch validation for adtrove.

pub mod app_config;
pub mod batch;
pub mod config;
pub mod validate;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use batch::{
    AdEntry, BatchPayload, BatchResult, InsightEntry, DEFAULT_INSIGHT_TYPE, DEFAULT_PLATFORM,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use validate::{
    validate_batch, ValidatedAd, ValidatedBatch, ValidatedInsight, ValidationError,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
