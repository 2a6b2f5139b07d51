//! Flow-run de-duplication endpoint

use axum::{extract::State, routing::post, Json, Router};
use chrono::Duration;
use ddash_common::flow_runs::{dedupe_runs_with_window, shadow_pending_window};
use ddash_common::models::FlowRun;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiError, ApiResult, AppState};

/// One week
const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Body of `POST /api/flow-runs/dedupe`
#[derive(Debug, Deserialize)]
pub struct DedupeRequest {
    #[serde(default)]
    pub runs: Vec<FlowRun>,
    /// Shadow-pending window; defaults to 30 minutes
    pub window_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DedupeResponse {
    pub runs: Vec<FlowRun>,
    pub input_count: usize,
    pub removed: usize,
}

/// POST /api/flow-runs/dedupe
pub async fn dedupe_flow_runs(
    State(_state): State<AppState>,
    Json(request): Json<DedupeRequest>,
) -> ApiResult<Json<DedupeResponse>> {
    let window = match request.window_minutes {
        Some(minutes) if !(0..=MAX_WINDOW_MINUTES).contains(&minutes) => {
            return Err(ApiError::BadRequest(format!(
                "window_minutes must be between 0 and {}",
                MAX_WINDOW_MINUTES
            )));
        }
        Some(minutes) => Duration::minutes(minutes),
        None => shadow_pending_window(),
    };

    let input_count = request.runs.len();
    let runs = dedupe_runs_with_window(request.runs, window);
    let removed = input_count - runs.len();

    debug!(input_count, removed, "Flow runs de-duplicated");

    Ok(Json(DedupeResponse {
        runs,
        input_count,
        removed,
    }))
}

/// Build flow-run routes
pub fn flow_run_routes() -> Router<AppState> {
    Router::new().route("/api/flow-runs/dedupe", post(dedupe_flow_runs))
}
