use std::collections::HashMap;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AdItem {
    id: i64,
    advertiser_name: String,
    platform: String,
    ad_identifier: String,
    image_url: String,
    metadata: Option<Value>,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    insights: Vec<InsightItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InsightItem {
    id: i64,
    model: String,
    insight_type: String,
    insight: String,
    raw_response: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AdsQuery {
    pub advertiser: Option<String>,
    pub limit: Option<i64>,
}

/// `GET /api/v1/ads?advertiser=&limit=`
pub(super) async fn list_ads(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<AdsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<AdItem>>>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected ads query");
        ApiError::new(req_id.0.clone(), "bad_request", rejection.body_text())
    })?;
    let advertiser = query
        .advertiser
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());

    let rows = adtrove_db::list_ads(&state.pool, advertiser, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let ad_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let insight_rows = adtrove_db::list_insights_for_ads(&state.pool, &ad_ids)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut insights_by_ad: HashMap<i64, Vec<InsightItem>> = HashMap::new();
    for row in insight_rows {
        insights_by_ad.entry(row.ad_id).or_default().push(InsightItem {
            id: row.id,
            model: row.model,
            insight_type: row.insight_type,
            insight: row.insight,
            raw_response: row.raw_response,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
    }

    let data = rows
        .into_iter()
        .map(|row| AdItem {
            insights: insights_by_ad.remove(&row.id).unwrap_or_default(),
            id: row.id,
            advertiser_name: row.advertiser_name,
            platform: row.platform,
            ad_identifier: row.ad_identifier,
            image_url: row.image_url,
            metadata: row.metadata,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
