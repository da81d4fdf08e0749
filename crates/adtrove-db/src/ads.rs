//! Database operations for the `ads` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `ads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdRow {
    pub id: i64,
    pub advertiser_name: String,
    pub platform: String,
    pub ad_identifier: String,
    pub image_url: String,
    pub metadata: Option<Value>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written by [`upsert_ad`].
#[derive(Debug, Clone, Copy)]
pub struct AdUpsert<'a> {
    pub advertiser_name: &'a str,
    pub platform: &'a str,
    pub ad_identifier: &'a str,
    pub image_url: &'a str,
    pub metadata: Option<&'a Value>,
    pub seen_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ads operations
// ---------------------------------------------------------------------------

/// Upserts an ad on its natural key `(advertiser_name, platform, ad_identifier)`.
///
/// On insert `first_seen` and `last_seen` are both `seen_at`. On conflict:
/// - `image_url` takes the new value;
/// - `metadata` takes the new value only when it is non-null;
/// - `last_seen` takes `seen_at` unconditionally, even when it is older than
///   the stored value;
/// - `first_seen` is never touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_ad(conn: &mut PgConnection, ad: &AdUpsert<'_>) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO ads \
             (advertiser_name, platform, ad_identifier, image_url, metadata, \
              first_seen, last_seen) \
         VALUES ($1, $2, $3, $4, $5::jsonb, $6, $6) \
         ON CONFLICT (advertiser_name, platform, ad_identifier) DO UPDATE SET \
             image_url  = EXCLUDED.image_url, \
             metadata   = COALESCE(EXCLUDED.metadata, ads.metadata), \
             last_seen  = EXCLUDED.last_seen, \
             updated_at = NOW()",
    )
    .bind(ad.advertiser_name)
    .bind(ad.platform)
    .bind(ad.ad_identifier)
    .bind(ad.image_url)
    .bind(ad.metadata)
    .bind(ad.seen_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Resolves an ad's internal `id` from its natural key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_ad_id(
    conn: &mut PgConnection,
    advertiser_name: &str,
    platform: &str,
    ad_identifier: &str,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM ads \
         WHERE advertiser_name = $1 AND platform = $2 AND ad_identifier = $3",
    )
    .bind(advertiser_name)
    .bind(platform)
    .bind(ad_identifier)
    .fetch_optional(conn)
    .await?;

    Ok(id)
}

/// Fetches a single ad by its natural key.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_ad(
    pool: &PgPool,
    advertiser_name: &str,
    platform: &str,
    ad_identifier: &str,
) -> Result<AdRow, DbError> {
    sqlx::query_as::<_, AdRow>(
        "SELECT id, advertiser_name, platform, ad_identifier, image_url, metadata, \
                first_seen, last_seen, created_at, updated_at \
         FROM ads \
         WHERE advertiser_name = $1 AND platform = $2 AND ad_identifier = $3",
    )
    .bind(advertiser_name)
    .bind(platform)
    .bind(ad_identifier)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns up to `limit` ads, most recently seen first, optionally restricted
/// to one advertiser.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ads(
    pool: &PgPool,
    advertiser_name: Option<&str>,
    limit: i64,
) -> Result<Vec<AdRow>, DbError> {
    let rows = sqlx::query_as::<_, AdRow>(
        "SELECT id, advertiser_name, platform, ad_identifier, image_url, metadata, \
                first_seen, last_seen, created_at, updated_at \
         FROM ads \
         WHERE ($1::text IS NULL OR advertiser_name = $1) \
         ORDER BY last_seen DESC, id DESC \
         LIMIT $2",
    )
    .bind(advertiser_name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
