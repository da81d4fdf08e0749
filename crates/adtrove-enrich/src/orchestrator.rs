//! Attaches AI-generated insights to collected creatives.
//!
//! Enrichment is best-effort: a failed or slow description leaves that
//! creative with no insights and never aborts the run.

use std::time::Duration;

use adtrove_core::DEFAULT_INSIGHT_TYPE;
use adtrove_scraper::CollectedCreative;
use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::describer::Describer;
use crate::error::EnrichError;
use crate::types::{EnrichedCreative, GeneratedInsight};

#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    pub describe_timeout: Duration,
    /// Maximum in-flight describer calls. `1` runs sequentially.
    pub concurrency: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            describe_timeout: Duration::from_secs(45),
            concurrency: 1,
        }
    }
}

/// Enriches every creative, preserving input order.
///
/// With `describer = None` each creative gets zero insights. Otherwise each
/// creative gets one `summary` insight on success and zero on failure.
pub async fn enrich_creatives(
    creatives: Vec<CollectedCreative>,
    describer: Option<&dyn Describer>,
    options: EnrichOptions,
) -> Vec<EnrichedCreative> {
    let Some(describer) = describer else {
        tracing::info!(creatives = creatives.len(), "enrichment disabled");
        return creatives
            .into_iter()
            .map(|creative| EnrichedCreative {
                creative,
                insights: Vec::new(),
            })
            .collect();
    };

    let total = creatives.len();
    let enriched = stream::iter(creatives.into_iter().map(move |creative| async move {
        let insights = match describe_one(describer, &creative.image_ref, options).await {
            Ok(insight) => vec![insight],
            Err(e) => {
                tracing::warn!(
                    image_ref = %creative.image_ref,
                    model = %describer.model_label(),
                    error = %e,
                    "enrichment failed; continuing without insight"
                );
                Vec::new()
            }
        };
        EnrichedCreative { creative, insights }
    }))
    .buffered(options.concurrency.max(1))
    .collect::<Vec<_>>()
    .await;

    let described = enriched.iter().filter(|e| !e.insights.is_empty()).count();
    tracing::info!(
        total,
        described,
        failed = total - described,
        model = %describer.model_label(),
        "enrichment finished"
    );
    enriched
}

async fn describe_one(
    describer: &dyn Describer,
    image_ref: &str,
    options: EnrichOptions,
) -> Result<GeneratedInsight, EnrichError> {
    let description = tokio::time::timeout(options.describe_timeout, describer.describe(image_ref))
        .await
        .map_err(|_| EnrichError::Timeout {
            secs: options.describe_timeout.as_secs(),
        })??;

    let text = description.text.trim();
    if text.is_empty() {
        return Err(EnrichError::EmptyDescription {
            model: describer.model_label(),
        });
    }

    Ok(GeneratedInsight {
        model: describer.model_label(),
        insight_type: DEFAULT_INSIGHT_TYPE.to_string(),
        insight: text.to_string(),
        raw_response: description.raw_response,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
