//! Wire types for the batch ingestion endpoint.
//!
//! Timestamps stay as raw strings here; [`crate::validate_batch`] parses them
//! so that a bad value can be reported with its field path instead of a
//! generic deserialization error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Platform assumed when a batch omits `platform`.
pub const DEFAULT_PLATFORM: &str = "meta";

/// Insight type assumed when an insight omits `insightType`.
pub const DEFAULT_INSIGHT_TYPE: &str = "summary";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
    #[serde(default)]
    pub advertiser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,
    #[serde(default)]
    pub ads: Option<Vec<AdEntry>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdEntry {
    #[serde(default)]
    pub ad_identifier: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// `null` and absent are equivalent: the stored value is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<InsightEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightEntry {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub insight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Response body for a successfully applied batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub advertiser: String,
    pub platform: String,
    pub processed_ads: usize,
}
