//! Metric Sample - one point of a run's metric history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One value of one metric at one step of a tracked run.
///
/// System metrics may contain gaps, stored as NaN (and as `null` in JSON).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSample {
    run_id: String,
    key: String,
    step: u64,
    #[serde(with = "nullable_f64")]
    value: f64,
    timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// Create a sample stamped with the current time.
    #[must_use]
    pub fn new(run_id: impl Into<String>, key: impl Into<String>, step: u64, value: f64) -> Self {
        Self::at(run_id, key, step, value, Utc::now())
    }

    /// Create a sample with an explicit timestamp.
    #[must_use]
    pub fn at(
        run_id: impl Into<String>,
        key: impl Into<String>,
        step: u64,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            key: key.into(),
            step,
            value,
            timestamp,
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the metric key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the step.
    #[must_use]
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// Get the value (NaN for a gap).
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// JSON has no NaN; round-trip it through `null`.
pub(crate) mod nullable_f64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            None::<f64>.serialize(serializer)
        } else {
            Some(*value).serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
