//! HTTP API handlers for ddash-tracker

pub mod buildinfo;
pub mod flow_runs;
pub mod health;
pub mod reconcile;
pub mod tracking;

pub use buildinfo::get_build_info;
pub use flow_runs::{dedupe_flow_runs, flow_run_routes};
pub use health::health_routes;
pub use reconcile::{classify_arrivals, classify_status, reconcile_routes};
pub use tracking::{add_tracking, bulk_add_tracking, get_tracking, list_tracking, tracking_routes};
