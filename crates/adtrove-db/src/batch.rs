//! Idempotent batch persistence for ads and their insights.

use adtrove_core::{BatchResult, ValidatedAd, ValidatedBatch};
use sqlx::{PgConnection, PgPool};

use crate::ads::{find_ad_id, upsert_ad, AdUpsert};
use crate::insights::{upsert_insight, InsightUpsert};
use crate::DbError;

/// Applies a validated batch inside a single transaction.
///
/// Ads are written in array order, and each ad's insights in array order.
/// After each ad upsert its `id` is re-read by natural key before any of its
/// insights are written. Any failure rolls back the whole batch, so either
/// every ad is persisted or none is.
///
/// Replaying the same batch is idempotent with respect to row counts: one
/// `ads` row per natural key and one `insights` row per
/// `(ad, model, insight_type)`.
///
/// # Errors
///
/// Returns [`DbError::Integrity`] if an upserted ad cannot be re-read, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn apply_batch(pool: &PgPool, batch: &ValidatedBatch) -> Result<BatchResult, DbError> {
    let mut tx = pool.begin().await?;
    let mut processed_ads = 0usize;

    for ad in &batch.ads {
        if let Err(e) = apply_ad(&mut tx, &batch.advertiser, &batch.platform, ad).await {
            tracing::error!(
                advertiser = %batch.advertiser,
                platform = %batch.platform,
                ad_identifier = %ad.ad_identifier,
                processed_ads,
                error = %e,
                "batch aborted; rolling back"
            );
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "batch rollback failed");
            }
            return Err(e);
        }
        processed_ads += 1;
    }

    tx.commit().await?;

    tracing::info!(
        advertiser = %batch.advertiser,
        platform = %batch.platform,
        processed_ads,
        "batch applied"
    );

    Ok(BatchResult {
        advertiser: batch.advertiser.clone(),
        platform: batch.platform.clone(),
        processed_ads,
    })
}

async fn apply_ad(
    conn: &mut PgConnection,
    advertiser: &str,
    platform: &str,
    ad: &ValidatedAd,
) -> Result<(), DbError> {
    upsert_ad(
        conn,
        &AdUpsert {
            advertiser_name: advertiser,
            platform,
            ad_identifier: &ad.ad_identifier,
            image_url: &ad.image_url,
            metadata: ad.metadata.as_ref(),
            seen_at: ad.seen_at,
        },
    )
    .await?;

    let ad_id = find_ad_id(conn, advertiser, platform, &ad.ad_identifier)
        .await?
        .ok_or_else(|| DbError::Integrity {
            advertiser: advertiser.to_string(),
            platform: platform.to_string(),
            ad_identifier: ad.ad_identifier.clone(),
        })?;

    for insight in &ad.insights {
        upsert_insight(
            conn,
            &InsightUpsert {
                ad_id,
                model: &insight.model,
                insight_type: &insight.insight_type,
                insight: &insight.insight,
                raw_response: insight.raw_response.as_ref(),
                created_at: insight.created_at,
                updated_at: ad.seen_at,
            },
        )
        .await?;
    }

    Ok(())
}
