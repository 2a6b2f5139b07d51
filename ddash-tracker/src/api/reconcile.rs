//! Shipment status endpoints
//!
//! The dashboard asks the server for statuses instead of carrying its own
//! copy of the reconciliation rule.

use axum::{extract::State, routing::post, Json, Router};
use ddash_common::lenient;
use ddash_common::models::Arrival;
use ddash_common::reconcile::{classify, summarize, ShipmentStatus, StatusSummary};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Body of `POST /api/reconcile/status`
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub saldo: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub outbounds_count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: ShipmentStatus,
}

/// Body of `POST /api/reconcile/arrivals`
#[derive(Debug, Deserialize)]
pub struct ArrivalsRequest {
    #[serde(default)]
    pub arrivals: Vec<Arrival>,
}

/// Status of one arrival
#[derive(Debug, Serialize)]
pub struct ArrivalStatus {
    #[serde(rename = "MRN")]
    pub mrn: Option<String>,
    pub saldo: Option<i64>,
    pub outbounds_count: usize,
    pub status: ShipmentStatus,
}

#[derive(Debug, Serialize)]
pub struct ArrivalsResponse {
    pub arrivals: Vec<ArrivalStatus>,
    pub summary: StatusSummary,
}

/// POST /api/reconcile/status
pub async fn classify_status(
    State(_state): State<AppState>,
    Json(query): Json<StatusQuery>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: classify(query.saldo, query.outbounds_count),
    })
}

/// POST /api/reconcile/arrivals
///
/// Statuses are returned in input order.
pub async fn classify_arrivals(
    State(_state): State<AppState>,
    Json(request): Json<ArrivalsRequest>,
) -> Json<ArrivalsResponse> {
    let arrivals: Vec<ArrivalStatus> = request
        .arrivals
        .into_iter()
        .map(|arrival| ArrivalStatus {
            status: arrival.status(),
            outbounds_count: arrival.outbounds.len(),
            saldo: arrival.saldo,
            mrn: arrival.mrn,
        })
        .collect();

    let summary = summarize(arrivals.iter().map(|a| a.status));

    Json(ArrivalsResponse { arrivals, summary })
}

/// Build reconciliation routes
pub fn reconcile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reconcile/status", post(classify_status))
        .route("/api/reconcile/arrivals", post(classify_arrivals))
}
