use adtrove_core::{validate_batch, BatchPayload, BatchResult, ValidationError};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, AppState};

/// `POST /api/v1/ads/batch`
///
/// Syntactically invalid JSON is a `bad_request`; well-formed JSON with a
/// wrongly typed field is a `validation_error` naming that field's path.
/// Validates the whole payload before touching the database, then applies it
/// in one transaction. Responds with the bare `{advertiser, platform,
/// processedAds}` result rather than the `data`/`meta` envelope.
pub(super) async fn ingest_batch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected batch body");
        ApiError::new(req_id.0.clone(), "bad_request", rejection.body_text())
    })?;

    let payload = decode_payload(body).map_err(|e| {
        tracing::info!(path = %e.path, reason = %e.reason, "batch has mistyped field");
        ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
            .with_details(json!({ "path": e.path, "reason": e.reason }))
    })?;

    let batch = validate_batch(payload, Utc::now()).map_err(|e| {
        tracing::info!(path = %e.path, reason = %e.reason, "batch failed validation");
        ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
            .with_details(json!({ "path": e.path, "reason": e.reason }))
    })?;

    let result = adtrove_db::apply_batch(&state.pool, &batch)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(result))
}

/// Deserializes the wire payload, reporting the path of the first field
/// whose JSON type does not match.
fn decode_payload(body: Value) -> Result<BatchPayload, ValidationError> {
    serde_path_to_error::deserialize(body).map_err(|e| {
        let path = e.path().to_string();
        let path = if path == "." { "body".to_string() } else { path };
        ValidationError {
            path,
            reason: e.into_inner().to_string(),
        }
    })
}
