//! Tracking note endpoints
//!
//! - `GET  /api/tracking`       whole store
//! - `GET  /api/tracking/:mrn`  one MRN's history, newest first
//! - `POST /api/tracking`       prepend one note
//! - `POST /api/tracking/bulk`  prepend many notes in one write

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use ddash_common::models::{TrackingEntry, TrackingFile};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiError, ApiResult, AppState};

/// One note for one MRN
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingUpdate {
    pub mrn: String,
    pub tracking_data: TrackingEntry,
}

/// Body of `POST /api/tracking/bulk`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BulkTrackingUpdate {
    #[serde(default)]
    pub records: Vec<TrackingUpdate>,
}

/// Response of `GET /api/tracking/:mrn`
#[derive(Debug, Serialize)]
pub struct MrnTrackingResponse {
    pub tracking_records: Vec<TrackingEntry>,
}

/// Response of `POST /api/tracking`
#[derive(Debug, Serialize)]
pub struct TrackingResponse {
    pub success: bool,
    pub message: String,
}

/// Response of `POST /api/tracking/bulk`
#[derive(Debug, Serialize)]
pub struct BulkTrackingResponse {
    pub success: bool,
    pub message: String,
    pub updated: usize,
}

/// GET /api/tracking
pub async fn list_tracking(State(state): State<AppState>) -> ApiResult<Json<TrackingFile>> {
    let file = state.store.load().await?;
    Ok(Json(file))
}

/// GET /api/tracking/:mrn
///
/// An MRN without notes yields an empty list, not a 404.
pub async fn get_tracking(
    State(state): State<AppState>,
    Path(mrn): Path<String>,
) -> ApiResult<Json<MrnTrackingResponse>> {
    let tracking_records = state.store.entries_for(mrn.trim()).await?;
    debug!(mrn = %mrn, count = tracking_records.len(), "Tracking records fetched");
    Ok(Json(MrnTrackingResponse { tracking_records }))
}

/// POST /api/tracking
pub async fn add_tracking(
    State(state): State<AppState>,
    Json(update): Json<TrackingUpdate>,
) -> ApiResult<Json<TrackingResponse>> {
    let mrn = normalize_mrn(&update.mrn)?;
    state.store.append(&mrn, update.tracking_data).await?;

    Ok(Json(TrackingResponse {
        success: true,
        message: format!("Tracking data saved for MRN {}", mrn),
    }))
}

/// POST /api/tracking/bulk
///
/// Every pair is validated before anything is written; one bad MRN rejects
/// the whole batch.
pub async fn bulk_add_tracking(
    State(state): State<AppState>,
    Json(bulk): Json<BulkTrackingUpdate>,
) -> ApiResult<Json<BulkTrackingResponse>> {
    let items = bulk
        .records
        .into_iter()
        .enumerate()
        .map(|(i, update)| {
            normalize_mrn(&update.mrn)
                .map(|mrn| (mrn, update.tracking_data))
                .map_err(|_| ApiError::BadRequest(format!("records[{}]: mrn is required", i)))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let outcome = state.store.append_bulk(items).await?;

    Ok(Json(BulkTrackingResponse {
        success: true,
        message: format!("Bulk update completed: {} records updated", outcome.updated),
        updated: outcome.updated,
    }))
}

/// Build tracking routes
pub fn tracking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tracking", get(list_tracking).post(add_tracking))
        .route("/api/tracking/bulk", post(bulk_add_tracking))
        .route("/api/tracking/:mrn", get(get_tracking))
}

fn normalize_mrn(raw: &str) -> ApiResult<String> {
    let mrn = raw.trim();
    if mrn.is_empty() {
        return Err(ApiError::BadRequest("mrn is required".to_string()));
    }
    Ok(mrn.to_string())
}
