//! Shipment status classification
//!
//! An arrival is reconciled against the export declarations that reference it.
//! The status is a pure function of the remaining package balance (`saldo`)
//! and the number of linked outbounds. This module is the only place that
//! rule is written down; every service derives statuses through [`classify`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reconciliation status of an inbound shipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    /// Every package has been declared outbound
    Complete,
    /// Outbounds exist but the balance does not add up
    Error,
    /// Packages remain and nothing has been declared outbound yet
    Waiting,
    /// Not enough data to decide
    Unknown,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Complete => "complete",
            ShipmentStatus::Error => "error",
            ShipmentStatus::Waiting => "waiting",
            ShipmentStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a shipment.
///
/// Rules are evaluated in order:
/// 1. `saldo == 0` → [`ShipmentStatus::Complete`], whatever the outbound count
/// 2. `saldo != 0` and outbounds > 0 → [`ShipmentStatus::Error`]
/// 3. `saldo != 0` and outbounds == 0 → [`ShipmentStatus::Waiting`]
/// 4. anything else (missing saldo, missing or negative count) → [`ShipmentStatus::Unknown`]
///
/// # Examples
/// ```
/// use ddash_common::reconcile::{classify, ShipmentStatus};
///
/// assert_eq!(classify(Some(0), Some(3)), ShipmentStatus::Complete);
/// assert_eq!(classify(Some(-2), Some(1)), ShipmentStatus::Error);
/// assert_eq!(classify(Some(12), Some(0)), ShipmentStatus::Waiting);
/// assert_eq!(classify(None, Some(0)), ShipmentStatus::Unknown);
/// ```
pub fn classify(saldo: Option<i64>, outbounds_count: Option<i64>) -> ShipmentStatus {
    match (saldo, outbounds_count) {
        (Some(0), _) => ShipmentStatus::Complete,
        (Some(_), Some(n)) if n > 0 => ShipmentStatus::Error,
        (Some(_), Some(0)) => ShipmentStatus::Waiting,
        _ => ShipmentStatus::Unknown,
    }
}

/// Per-status counts over a set of shipments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub complete: usize,
    pub error: usize,
    pub waiting: usize,
    pub unknown: usize,
    pub total: usize,
}

impl StatusSummary {
    pub fn record(&mut self, status: ShipmentStatus) {
        match status {
            ShipmentStatus::Complete => self.complete += 1,
            ShipmentStatus::Error => self.error += 1,
            ShipmentStatus::Waiting => self.waiting += 1,
            ShipmentStatus::Unknown => self.unknown += 1,
        }
        self.total += 1;
    }
}

/// Count statuses
pub fn summarize<I>(statuses: I) -> StatusSummary
where
    I: IntoIterator<Item = ShipmentStatus>,
{
    statuses
        .into_iter()
        .fold(StatusSummary::default(), |mut summary, status| {
            summary.record(status);
            summary
        })
}
