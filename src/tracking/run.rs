//! Tracked Run - one sweep point as seen by the tracking store

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::sweep::{SweepPoint, SweepResult, SweepStatus};

/// A finished trainer run with its summary values.
///
/// `started_at` is derived from the end time and the measured duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedRun {
    run_id: String,
    point: SweepPoint,
    command: String,
    status: SweepStatus,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    #[serde(default)]
    summary: BTreeMap<String, f64>,
}

impl TrackedRun {
    /// Build a run from a sweep result that ended at `ended_at`.
    ///
    /// The run ID defaults to the point's ID; the store may suffix it to
    /// keep repeated sweeps apart.
    #[must_use]
    pub fn from_result(result: &SweepResult, ended_at: DateTime<Utc>) -> Self {
        // Sub-millisecond precision is irrelevant for multi-minute runs
        #[allow(clippy::cast_possible_truncation)]
        let elapsed = Duration::milliseconds((result.duration_seconds() * 1000.0) as i64);
        let mut summary = BTreeMap::new();
        summary.insert("duration_seconds".to_string(), result.duration_seconds());

        Self {
            run_id: result.point().run_id(),
            point: *result.point(),
            command: result.command().to_string(),
            status: result.status(),
            started_at: ended_at - elapsed,
            ended_at,
            summary,
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub(crate) fn set_run_id(&mut self, run_id: String) {
        self.run_id = run_id;
    }

    /// Get the sweep point.
    #[must_use]
    pub const fn point(&self) -> &SweepPoint {
        &self.point
    }

    /// Get the invocation string.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Get the status.
    #[must_use]
    pub const fn status(&self) -> SweepStatus {
        self.status
    }

    /// Get the start time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Get the end time.
    #[must_use]
    pub const fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    /// Get a summary value.
    #[must_use]
    pub fn summary_value(&self, key: &str) -> Option<f64> {
        self.summary.get(key).copied()
    }

    /// Get all summary values.
    #[must_use]
    pub const fn summary(&self) -> &BTreeMap<String, f64> {
        &self.summary
    }

    /// Set a summary value, replacing any previous one.
    pub fn set_summary(&mut self, key: impl Into<String>, value: f64) {
        self.summary.insert(key.into(), value);
    }
}
