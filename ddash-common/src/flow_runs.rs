//! Flow-run de-duplication
//!
//! The automation log reports the same run more than once: retried webhook
//! deliveries repeat the identical record, and a run that was logged as
//! `pending` keeps that stale entry after its completion is logged separately.
//! This filter removes both kinds of duplicate. It is a best-effort heuristic
//! over data the log does not make unique, not an authoritative view.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::models::FlowRun;
use crate::time::parse_timestamp_value;

/// Default distance within which a completed run hides a pending one
pub const SHADOW_PENDING_WINDOW_MINUTES: i64 = 30;

const PENDING: &str = "pending";

pub fn shadow_pending_window() -> Duration {
    Duration::minutes(SHADOW_PENDING_WINDOW_MINUTES)
}

/// Identity of a run: `runId`, else `id`, else a composite of
/// `fileRef|projectName|status|timestamp`
pub fn identity_key(run: &FlowRun) -> String {
    if let Some(run_id) = non_empty(&run.run_id) {
        return format!("run:{}", run_id);
    }
    if let Some(id) = non_empty(&run.id) {
        return format!("id:{}", id);
    }

    let timestamp = match &run.timestamp {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    format!(
        "composite:{}|{}|{}|{}",
        run.file_ref.as_deref().unwrap_or_default(),
        run.project_name.as_deref().unwrap_or_default(),
        run.status.as_deref().unwrap_or_default(),
        timestamp
    )
}

/// Drop repeated records, keeping the first occurrence and the input order
pub fn dedupe_by_identity(runs: Vec<FlowRun>) -> Vec<FlowRun> {
    let mut seen = HashSet::new();
    runs.into_iter()
        .filter(|run| seen.insert(identity_key(run)))
        .collect()
}

/// Drop `pending` records shadowed by a non-pending record for the same
/// `fileRef` and `projectName` whose timestamp lies within `window`.
///
/// Records lacking either key field or a parseable timestamp are kept.
pub fn suppress_shadow_pending(runs: Vec<FlowRun>, window: Duration) -> Vec<FlowRun> {
    let mut settled: HashMap<(&str, &str), Vec<DateTime<Utc>>> = HashMap::new();
    for run in &runs {
        let Some(status) = run.status.as_deref() else {
            continue;
        };
        if is_pending(status) {
            continue;
        }
        if let (Some(key), Some(ts)) = (group_key(run), run_timestamp(run)) {
            settled.entry(key).or_default().push(ts);
        }
    }

    let keep: Vec<bool> = runs
        .iter()
        .map(|run| {
            if !run.status.as_deref().is_some_and(is_pending) {
                return true;
            }
            let (Some(key), Some(ts)) = (group_key(run), run_timestamp(run)) else {
                return true;
            };
            let shadowed = settled
                .get(&key)
                .is_some_and(|times| times.iter().any(|t| within(*t, ts, window)));
            !shadowed
        })
        .collect();

    let before = runs.len();
    let kept: Vec<FlowRun> = runs
        .into_iter()
        .zip(keep)
        .filter_map(|(run, keep)| keep.then_some(run))
        .collect();

    if kept.len() < before {
        debug!(
            suppressed = before - kept.len(),
            "Suppressed shadow pending flow runs"
        );
    }
    kept
}

/// Full de-duplication with the default 30 minute window
pub fn dedupe_runs(runs: Vec<FlowRun>) -> Vec<FlowRun> {
    dedupe_runs_with_window(runs, shadow_pending_window())
}

/// Full de-duplication: identity first, then shadow-pending suppression
pub fn dedupe_runs_with_window(runs: Vec<FlowRun>, window: Duration) -> Vec<FlowRun> {
    suppress_shadow_pending(dedupe_by_identity(runs), window)
}

fn is_pending(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case(PENDING)
}

fn within(a: DateTime<Utc>, b: DateTime<Utc>, window: Duration) -> bool {
    a - b <= window && b - a <= window
}

fn group_key(run: &FlowRun) -> Option<(&str, &str)> {
    Some((non_empty(&run.file_ref)?, non_empty(&run.project_name)?))
}

fn run_timestamp(run: &FlowRun) -> Option<DateTime<Utc>> {
    run.timestamp.as_ref().and_then(parse_timestamp_value)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
