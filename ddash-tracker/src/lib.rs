//! ddash-tracker library - tracking notes service
//!
//! Persists operator notes per MRN in a flat JSON file and exposes the shared
//! reconciliation computations (shipment status, flow-run de-duplication) to
//! the dashboard over HTTP.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod store;

pub use crate::error::{ApiError, ApiResult};
pub use crate::store::TrackingStore;

/// Largest accepted request body (bulk updates and flow-run batches)
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Tracking note store
    pub store: Arc<TrackingStore>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: TrackingStore) -> Self {
        Self {
            store: Arc::new(store),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::tracking_routes())
        .merge(api::reconcile_routes())
        .merge(api::flow_run_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
