//! # ddash Common Library
//!
//! Shared code for the declaration dashboard services including:
//! - Error type and result alias
//! - Configuration loading
//! - Declaration, tracking and flow-run data models
//! - Shipment status classification (the single reconciliation rule)
//! - Flow-run de-duplication
//! - Tolerant deserializers for loosely typed records
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod flow_runs;
pub mod lenient;
pub mod models;
pub mod reconcile;
pub mod time;

pub use error::{Error, Result};
pub use reconcile::{classify, ShipmentStatus};
