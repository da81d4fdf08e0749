//! Fail-fast validation of an incoming [`BatchPayload`].
//!
//! Validation runs to completion before any persistence. The first violation
//! found is returned with the JSON path of the offending field, e.g.
//! `ads[2].insights[0].createdAt`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::batch::{AdEntry, BatchPayload, InsightEntry, DEFAULT_INSIGHT_TYPE, DEFAULT_PLATFORM};

const NUL_REASON: &str = "must not contain NUL (U+0000) characters";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid field `{path}`: {reason}")]
pub struct ValidationError {
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A batch whose fields have been checked and whose timestamps have been
/// resolved to their effective values.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub advertiser: String,
    pub platform: String,
    pub ads: Vec<ValidatedAd>,
}

#[derive(Debug, Clone)]
pub struct ValidatedAd {
    pub ad_identifier: String,
    pub image_url: String,
    pub metadata: Option<Value>,
    /// `seenAt`, else the batch `scrapedAt`, else the batch start time.
    pub seen_at: DateTime<Utc>,
    pub insights: Vec<ValidatedInsight>,
}

#[derive(Debug, Clone)]
pub struct ValidatedInsight {
    pub model: String,
    pub insight_type: String,
    pub insight: String,
    pub raw_response: Option<Value>,
    /// Entry `createdAt`, else the owning ad's `seen_at`.
    pub created_at: DateTime<Utc>,
}

/// Validate a wire payload and resolve effective timestamps.
///
/// `now` is the batch start time; it is the single default used for every ad
/// that carries neither `seenAt` nor a batch-level `scrapedAt`.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate_batch(
    payload: BatchPayload,
    now: DateTime<Utc>,
) -> Result<ValidatedBatch, ValidationError> {
    let advertiser = required_text(payload.advertiser.as_deref(), "advertiser")?;

    let platform = match payload.platform.as_deref() {
        None => DEFAULT_PLATFORM.to_string(),
        Some(p) => required_text(Some(p), "platform")?,
    };

    let scraped_at = optional_timestamp(payload.scraped_at.as_deref(), "scrapedAt")?;
    let batch_default = scraped_at.unwrap_or(now);

    let entries = payload.ads.unwrap_or_default();
    if entries.is_empty() {
        return Err(ValidationError::new(
            "ads",
            "must be a non-empty array of ads",
        ));
    }

    let ads = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| validate_ad(entry, index, batch_default))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedBatch {
        advertiser,
        platform,
        ads,
    })
}

fn validate_ad(
    entry: AdEntry,
    index: usize,
    batch_default: DateTime<Utc>,
) -> Result<ValidatedAd, ValidationError> {
    let prefix = format!("ads[{index}]");

    let ad_identifier = required_text(
        entry.ad_identifier.as_deref(),
        &format!("{prefix}.adIdentifier"),
    )?;
    let image_url = required_text(entry.image_url.as_deref(), &format!("{prefix}.imageUrl"))?;

    if let Some(metadata) = &entry.metadata {
        if !metadata.is_object() {
            return Err(ValidationError::new(
                format!("{prefix}.metadata"),
                format!("must be a JSON object, got {}", json_kind(metadata)),
            ));
        }
        reject_nul_in_json(metadata, &format!("{prefix}.metadata"))?;
    }

    let seen_at = optional_timestamp(entry.seen_at.as_deref(), &format!("{prefix}.seenAt"))?
        .unwrap_or(batch_default);

    let insights = entry
        .insights
        .into_iter()
        .enumerate()
        .map(|(i, insight)| validate_insight(insight, &format!("{prefix}.insights[{i}]"), seen_at))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedAd {
        ad_identifier,
        image_url,
        metadata: entry.metadata,
        seen_at,
        insights,
    })
}

fn validate_insight(
    entry: InsightEntry,
    prefix: &str,
    ad_seen_at: DateTime<Utc>,
) -> Result<ValidatedInsight, ValidationError> {
    let model = required_text(entry.model.as_deref(), &format!("{prefix}.model"))?;

    let insight = match entry.insight {
        Some(text) if !text.trim().is_empty() => text,
        _ => {
            return Err(ValidationError::new(
                format!("{prefix}.insight"),
                "must be a non-empty string",
            ))
        }
    };
    if insight.contains('\0') {
        return Err(ValidationError::new(
            format!("{prefix}.insight"),
            NUL_REASON,
        ));
    }

    let insight_type = match entry.insight_type.as_deref() {
        None => DEFAULT_INSIGHT_TYPE.to_string(),
        Some(t) => required_text(Some(t), &format!("{prefix}.insightType"))?,
    };

    if let Some(raw_response) = &entry.raw_response {
        reject_nul_in_json(raw_response, &format!("{prefix}.rawResponse"))?;
    }

    let created_at = optional_timestamp(entry.created_at.as_deref(), &format!("{prefix}.createdAt"))?
        .unwrap_or(ad_seen_at);

    Ok(ValidatedInsight {
        model,
        insight_type,
        insight,
        raw_response: entry.raw_response,
        created_at,
    })
}

/// Key components are stored verbatim, so padded values are rejected rather
/// than trimmed into a different key.
fn required_text(value: Option<&str>, path: &str) -> Result<String, ValidationError> {
    let Some(v) = value.filter(|v| !v.trim().is_empty()) else {
        return Err(ValidationError::new(path, "must be a non-empty string"));
    };
    if v.trim() != v {
        return Err(ValidationError::new(
            path,
            "must not have leading or trailing whitespace",
        ));
    }
    if v.contains('\0') {
        return Err(ValidationError::new(path, NUL_REASON));
    }
    Ok(v.to_string())
}

/// Postgres `text` and `jsonb` cannot store U+0000.
fn reject_nul_in_json(value: &Value, path: &str) -> Result<(), ValidationError> {
    let has_nul = match value {
        Value::String(s) => s.contains('\0'),
        Value::Array(items) => {
            return items.iter().try_for_each(|item| reject_nul_in_json(item, path));
        }
        Value::Object(map) => {
            for (key, item) in map {
                if key.contains('\0') {
                    return Err(ValidationError::new(path, NUL_REASON));
                }
                reject_nul_in_json(item, path)?;
            }
            false
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    };
    if has_nul {
        return Err(ValidationError::new(path, NUL_REASON));
    }
    Ok(())
}

fn optional_timestamp(
    value: Option<&str>,
    path: &str,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|e| ValidationError::new(path, format!("must be an ISO 8601 timestamp: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
