use adtrove_scraper::CollectedCreative;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Output of one successful [`crate::Describer`] call.
#[derive(Debug, Clone)]
pub struct Description {
    pub text: String,
    /// Provider payload, stored verbatim as the insight's `raw_response`.
    pub raw_response: Option<Value>,
}

/// An AI-generated insight ready to be attached to an ad.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedInsight {
    /// `{provider}:{model}`, e.g. `openai:gpt-4o-mini`.
    pub model: String,
    pub insight_type: String,
    pub insight: String,
    pub raw_response: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// A collected creative together with whatever insights enrichment produced.
#[derive(Debug, Clone)]
pub struct EnrichedCreative {
    pub creative: CollectedCreative,
    /// Zero or one entries: empty when enrichment is disabled or failed.
    pub insights: Vec<GeneratedInsight>,
}

/// Settings for the OpenAI-compatible vision describer and the orchestrator.
#[derive(Clone)]
pub struct EnrichConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub concurrency: usize,
}

impl EnrichConfig {
    /// Returns `None` when no `OPENAI_API_KEY` is configured, which disables
    /// enrichment.
    #[must_use]
    pub fn from_app_config(config: &adtrove_core::AppConfig) -> Option<Self> {
        let api_key = config.openai_api_key.clone()?;
        Some(Self {
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_vision_model.clone(),
            timeout_secs: config.enrich_timeout_secs,
            concurrency: config.enrich_concurrency,
        })
    }
}

impl std::fmt::Debug for EnrichConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichConfig")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
