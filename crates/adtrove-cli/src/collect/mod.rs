//! `collect` command: scrape an advertiser's ad library, enrich the unique
//! creatives, and deliver them as one batch.
//!
//! A collection that cannot produce its first pass, or never sees a single
//! creative, aborts the run. Later pass failures and per-creative enrichment
//! failures only shrink the batch.

mod payload;

use std::path::PathBuf;
use std::time::Duration;

use adtrove_core::{AppConfig, BatchPayload};
use adtrove_enrich::{enrich_creatives, Describer, EnrichConfig, EnrichOptions, OpenAiDescriber};
use adtrove_scraper::{BrowserlessConfig, BrowserlessSession, CollectorConfig, CreativeCollector};
use anyhow::Context;
use chrono::Utc;

use crate::transport::{BatchTransport, HttpBatchTransport};

#[derive(Debug, Clone)]
pub(crate) struct CollectOptions {
    pub advertiser: String,
    pub platform: String,
    pub no_enrich: bool,
    pub max_passes: Option<usize>,
    pub dry_run: bool,
    pub output: Option<PathBuf>,
}

/// Runs one collection for `options.advertiser`.
///
/// # Errors
///
/// Returns an error if the advertiser is blank, the first extraction pass
/// fails, the payload cannot be written, or delivery is rejected.
pub(crate) async fn run_collect(config: &AppConfig, options: &CollectOptions) -> anyhow::Result<()> {
    let advertiser = options.advertiser.trim();
    if advertiser.is_empty() {
        anyhow::bail!("--advertiser must not be blank");
    }
    let platform = options.platform.trim();
    if platform.is_empty() {
        anyhow::bail!("--platform must not be blank");
    }

    let browserless = BrowserlessConfig::from_app_config(config);
    let mut session = BrowserlessSession::new(&browserless, advertiser)
        .context("failed to open ad library session")?;

    let mut collector_config = CollectorConfig::from_app_config(config);
    if let Some(max_passes) = options.max_passes {
        collector_config.max_passes = max_passes.max(1);
    }

    tracing::info!(
        advertiser,
        platform,
        url = %session.page_url(),
        max_passes = collector_config.max_passes,
        "starting collection"
    );

    let mut collector = CreativeCollector::new(collector_config);
    let summary = collector
        .run(&mut session)
        .await
        .with_context(|| format!("collection failed for advertiser '{advertiser}'"))?;
    println!(
        "collected {} creatives for {advertiser} in {} passes ({:?})",
        summary.unique_creatives, summary.passes, summary.stop_reason
    );

    let creatives = collector.into_creatives();

    let describer = build_describer(config, options.no_enrich)?;
    let enrich_options = EnrichOptions {
        describe_timeout: Duration::from_secs(config.enrich_timeout_secs),
        concurrency: config.enrich_concurrency.max(1),
    };
    let enriched = enrich_creatives(
        creatives,
        describer.as_ref().map(|d| d as &dyn Describer),
        enrich_options,
    )
    .await;
    let insights: usize = enriched.iter().map(|e| e.insights.len()).sum();

    let payload = payload::build_payload(advertiser, platform, &enriched, Utc::now());

    if let Some(path) = &options.output {
        write_payload(path, &payload)?;
        println!("wrote payload to {}", path.display());
    }

    if options.dry_run {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        println!(
            "[dry-run] {} ads ({insights} insights) for {advertiser} not delivered",
            enriched.len()
        );
        return Ok(());
    }

    let transport = HttpBatchTransport::from_app_config(config)?;
    tracing::debug!(endpoint = %transport.endpoint(), "delivering batch");
    let processed = deliver(&transport, &payload).await?;
    println!(
        "delivered {processed} ads ({insights} insights) for {advertiser} on {platform}"
    );
    Ok(())
}

fn build_describer(
    config: &AppConfig,
    no_enrich: bool,
) -> anyhow::Result<Option<OpenAiDescriber>> {
    if no_enrich {
        tracing::info!("enrichment disabled by --no-enrich");
        return Ok(None);
    }
    let Some(enrich_config) = EnrichConfig::from_app_config(config) else {
        tracing::info!("OPENAI_API_KEY not set; skipping enrichment");
        return Ok(None);
    };
    let describer =
        OpenAiDescriber::new(&enrich_config).context("failed to build vision describer")?;
    Ok(Some(describer))
}

fn write_payload(path: &std::path::Path, payload: &BatchPayload) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write payload to {}", path.display()))
}

/// Sends the batch and returns the processed ad count reported by storage.
async fn deliver(transport: &dyn BatchTransport, payload: &BatchPayload) -> anyhow::Result<usize> {
    let result = transport
        .send(payload)
        .await
        .context("batch delivery failed")?;
    tracing::info!(
        advertiser = %result.advertiser,
        platform = %result.platform,
        processed_ads = result.processed_ads,
        "batch delivered"
    );
    Ok(result.processed_ads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adtrove_core::BatchResult;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::transport::TransportError;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<BatchPayload>>,
        reject: bool,
    }

    #[async_trait]
    impl BatchTransport for RecordingTransport {
        async fn send(&self, payload: &BatchPayload) -> Result<BatchResult, TransportError> {
            self.sent.lock().await.push(payload.clone());
            if self.reject {
                return Err(TransportError::Rejected {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(BatchResult {
                advertiser: payload.advertiser.clone().unwrap_or_default(),
                platform: payload.platform.clone().unwrap_or_default(),
                processed_ads: payload.ads.as_ref().map_or(0, Vec::len),
            })
        }
    }

    fn payload() -> BatchPayload {
        serde_json::from_value(serde_json::json!({
            "advertiser": "Acme",
            "platform": "meta",
            "ads": [
                { "adIdentifier": "a1", "imageUrl": "u1" },
                { "adIdentifier": "a2", "imageUrl": "u2" }
            ]
        }))
        .expect("payload")
    }

    #[tokio::test]
    async fn deliver_returns_processed_count() {
        let transport = RecordingTransport::default();

        let processed = deliver(&transport, &payload()).await.expect("deliver");

        assert_eq!(processed, 2);
        assert_eq!(transport.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn deliver_surfaces_transport_rejection() {
        let transport = RecordingTransport {
            reject: true,
            ..RecordingTransport::default()
        };

        let err = deliver(&transport, &payload()).await.expect_err("rejected");

        assert!(format!("{err:#}").contains("status 500"));
    }

    #[test]
    fn write_payload_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("adtrove-payload-{}.json", std::process::id()));

        write_payload(&path, &payload()).expect("write");
        let raw = std::fs::read_to_string(&path).expect("read back");
        let _ = std::fs::remove_file(&path);

        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(parsed["advertiser"], "Acme");
        assert_eq!(parsed["ads"][1]["adIdentifier"], "a2");
    }

    #[test]
    fn no_enrich_skips_describer() {
        let config = adtrove_core::load_app_config_from_env().expect("config");
        assert!(build_describer(&config, true).expect("describer").is_none());
    }
}
