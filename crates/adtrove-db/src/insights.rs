//! Database operations for the `insights` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// A row from the `insights` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InsightRow {
    pub id: i64,
    pub ad_id: i64,
    pub model: String,
    pub insight_type: String,
    pub insight: String,
    pub raw_response: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written by [`upsert_insight`].
#[derive(Debug, Clone, Copy)]
pub struct InsightUpsert<'a> {
    pub ad_id: i64,
    pub model: &'a str,
    pub insight_type: &'a str,
    pub insight: &'a str,
    pub raw_response: Option<&'a Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upserts an insight on `(ad_id, model, insight_type)`.
///
/// Conflicts overwrite `insight`, `raw_response`, and `updated_at`.
/// `created_at` keeps the value from the first insert.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_insight(
    conn: &mut PgConnection,
    insight: &InsightUpsert<'_>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO insights \
             (ad_id, model, insight_type, insight, raw_response, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5::jsonb, $6, $7) \
         ON CONFLICT (ad_id, model, insight_type) DO UPDATE SET \
             insight      = EXCLUDED.insight, \
             raw_response = EXCLUDED.raw_response, \
             updated_at   = EXCLUDED.updated_at",
    )
    .bind(insight.ad_id)
    .bind(insight.model)
    .bind(insight.insight_type)
    .bind(insight.insight)
    .bind(insight.raw_response)
    .bind(insight.created_at)
    .bind(insight.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Returns every insight belonging to the given ads, newest update first.
///
/// Ordered by `updated_at DESC, id DESC` so callers can group by `ad_id`
/// and keep the per-ad ordering.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_insights_for_ads(
    pool: &PgPool,
    ad_ids: &[i64],
) -> Result<Vec<InsightRow>, DbError> {
    if ad_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, InsightRow>(
        "SELECT id, ad_id, model, insight_type, insight, raw_response, created_at, updated_at \
         FROM insights \
         WHERE ad_id = ANY($1) \
         ORDER BY updated_at DESC, id DESC",
    )
    .bind(ad_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
