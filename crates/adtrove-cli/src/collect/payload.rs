//! Conversion of enriched creatives into the wire batch format.

use adtrove_core::{AdEntry, BatchPayload, InsightEntry};
use adtrove_enrich::{EnrichedCreative, GeneratedInsight};
use adtrove_scraper::derive_ad_identifier;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds the batch for one collection run.
///
/// Ads keep the collector's first-seen order; their 1-based position is the
/// ordinal baked into the identifier and recorded in `metadata`.
pub(crate) fn build_payload(
    advertiser: &str,
    platform: &str,
    creatives: &[EnrichedCreative],
    run_at: DateTime<Utc>,
) -> BatchPayload {
    let run_at = rfc3339(run_at);

    let ads = creatives
        .iter()
        .enumerate()
        .map(|(index, enriched)| {
            let ordinal = index + 1;
            let creative = &enriched.creative;
            AdEntry {
                ad_identifier: Some(derive_ad_identifier(&creative.image_ref, ordinal)),
                image_url: Some(creative.image_ref.clone()),
                metadata: Some(json!({
                    "altText": creative.alt_text,
                    "textSnippets": creative.text_snippets,
                    "ordinal": ordinal,
                })),
                insights: enriched.insights.iter().map(insight_entry).collect(),
                seen_at: Some(run_at.clone()),
            }
        })
        .collect();

    BatchPayload {
        advertiser: Some(advertiser.to_string()),
        platform: Some(platform.to_string()),
        scraped_at: Some(run_at),
        ads: Some(ads),
    }
}

fn insight_entry(insight: &GeneratedInsight) -> InsightEntry {
    InsightEntry {
        model: Some(insight.model.clone()),
        insight: Some(insight.insight.clone()),
        insight_type: Some(insight.insight_type.clone()),
        raw_response: insight.raw_response.clone(),
        created_at: Some(rfc3339(insight.created_at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adtrove_core::validate_batch;
    use adtrove_scraper::CollectedCreative;
    use chrono::TimeZone;

    fn run_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time")
    }

    fn creative(image_ref: &str, alt: Option<&str>, snippets: &[&str]) -> CollectedCreative {
        CollectedCreative {
            image_ref: image_ref.to_string(),
            alt_text: alt.map(ToOwned::to_owned),
            text_snippets: snippets.iter().map(ToString::to_string).collect(),
        }
    }

    fn enriched(creative: CollectedCreative, insights: Vec<GeneratedInsight>) -> EnrichedCreative {
        EnrichedCreative { creative, insights }
    }

    #[test]
    fn builds_one_ad_per_creative_in_order() {
        let creatives = vec![
            enriched(creative("https://cdn/a.jpg", Some("shoe"), &["Buy now"]), vec![]),
            enriched(creative("https://cdn/b.jpg", None, &[]), vec![]),
        ];

        let payload = build_payload("Acme", "meta", &creatives, run_at());

        assert_eq!(payload.advertiser.as_deref(), Some("Acme"));
        assert_eq!(payload.platform.as_deref(), Some("meta"));
        assert_eq!(payload.scraped_at.as_deref(), Some("2026-03-01T12:00:00.000Z"));

        let ads = payload.ads.expect("ads");
        assert_eq!(ads.len(), 2);
        assert_eq!(
            ads[0].ad_identifier.as_deref(),
            Some(derive_ad_identifier("https://cdn/a.jpg", 1).as_str())
        );
        assert_eq!(
            ads[1].ad_identifier.as_deref(),
            Some(derive_ad_identifier("https://cdn/b.jpg", 2).as_str())
        );
        assert_eq!(ads[0].image_url.as_deref(), Some("https://cdn/a.jpg"));
        assert_eq!(ads[1].seen_at, payload.scraped_at);
    }

    #[test]
    fn metadata_carries_alt_text_snippets_and_ordinal() {
        let creatives = vec![enriched(
            creative("https://cdn/a.jpg", Some("shoe"), &["Buy now", "Free shipping"]),
            vec![],
        )];

        let payload = build_payload("Acme", "meta", &creatives, run_at());
        let ads = payload.ads.expect("ads");

        assert_eq!(
            ads[0].metadata,
            Some(json!({
                "altText": "shoe",
                "textSnippets": ["Buy now", "Free shipping"],
                "ordinal": 1
            }))
        );
        assert!(ads[0].insights.is_empty());
    }

    #[test]
    fn generated_insights_are_carried_through() {
        let generated = GeneratedInsight {
            model: "openai:gpt-4o-mini".to_string(),
            insight_type: "summary".to_string(),
            insight: "A red running shoe.".to_string(),
            raw_response: Some(json!({ "id": "chatcmpl-1" })),
            created_at: run_at(),
        };
        let creatives = vec![enriched(creative("https://cdn/a.jpg", None, &[]), vec![generated])];

        let payload = build_payload("Acme", "meta", &creatives, run_at());
        let ads = payload.ads.expect("ads");
        let insight = &ads[0].insights[0];

        assert_eq!(insight.model.as_deref(), Some("openai:gpt-4o-mini"));
        assert_eq!(insight.insight_type.as_deref(), Some("summary"));
        assert_eq!(insight.insight.as_deref(), Some("A red running shoe."));
        assert_eq!(insight.raw_response, Some(json!({ "id": "chatcmpl-1" })));
        assert_eq!(insight.created_at.as_deref(), Some("2026-03-01T12:00:00.000Z"));
    }

    #[test]
    fn built_payload_passes_ingest_validation() {
        let generated = GeneratedInsight {
            model: "openai:gpt-4o-mini".to_string(),
            insight_type: "summary".to_string(),
            insight: "desc".to_string(),
            raw_response: None,
            created_at: run_at(),
        };
        let creatives = vec![
            enriched(creative("https://cdn/a.jpg", Some("shoe"), &["x"]), vec![generated]),
            enriched(creative("https://cdn/b.jpg", None, &[]), vec![]),
        ];

        let payload = build_payload("Acme", "meta", &creatives, run_at());
        let batch = validate_batch(payload, Utc::now()).expect("valid batch");

        assert_eq!(batch.advertiser, "Acme");
        assert_eq!(batch.ads.len(), 2);
        assert_eq!(batch.ads[0].seen_at, run_at());
        assert_eq!(batch.ads[0].insights[0].created_at, run_at());
    }
}
