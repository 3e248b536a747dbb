//! Sweep Result - outcome of executing one sweep point

use serde::{Deserialize, Serialize};

use super::SweepPoint;
use crate::monitor::GpuSample;

/// Outcome of a sweep point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepStatus {
    /// Trainer exited with status 0.
    Success,
    /// Trainer exited non-zero, was killed, or timed out.
    Failure,
}

/// Sweep Result records one finished trainer invocation.
///
/// Results are created only after the trainer has exited and are never
/// modified afterwards. Successful results are appended once to the
/// results sink; failed ones only reach the operational log and the
/// sweep report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepResult {
    point: SweepPoint,
    duration_seconds: f64,
    command: String,
    status: SweepStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    system_samples: Vec<GpuSample>,
}

impl SweepResult {
    /// Create a result for a finished invocation.
    ///
    /// # Arguments
    ///
    /// * `point` - The point that was executed
    /// * `duration_seconds` - Wall-clock time from spawn to exit (clamped to `>= 0`)
    /// * `command` - Exact invocation string
    /// * `status` - Success or failure
    #[must_use]
    pub fn new(
        point: SweepPoint,
        duration_seconds: f64,
        command: impl Into<String>,
        status: SweepStatus,
    ) -> Self {
        Self {
            point,
            duration_seconds: duration_seconds.max(0.0),
            command: command.into(),
            status,
            system_samples: Vec::new(),
        }
    }

    /// Attach utilization readings gathered during the invocation.
    #[must_use]
    pub fn with_system_samples(mut self, samples: Vec<GpuSample>) -> Self {
        self.system_samples = samples;
        self
    }

    /// Get the executed point.
    #[must_use]
    pub const fn point(&self) -> &SweepPoint {
        &self.point
    }

    /// Get the wall-clock duration in seconds.
    #[must_use]
    pub const fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Get the exact invocation string.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Get the status.
    #[must_use]
    pub const fn status(&self) -> SweepStatus {
        self.status
    }

    /// Whether the trainer succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SweepStatus::Success
    }

    /// Get utilization readings taken during the run.
    #[must_use]
    pub fn system_samples(&self) -> &[GpuSample] {
        &self.system_samples
    }
}
