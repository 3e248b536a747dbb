//! Sweep Driver - executes a plan point by point

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::{SweepPlan, SweepResult, SweepStatus};
use crate::invoker::{InvocationTemplate, TrainerInvoker};
use crate::sink::ResultsSink;
use crate::{Error, Result};

const STDERR_TAIL_LINES: usize = 20;

/// What the driver does after a trainer failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Skip the rest of the failing point's sub-sweep, then carry on.
    #[default]
    AbortSubSweep,
    /// Carry on with the next point.
    Continue,
    /// Stop the sweep. Results gathered so far are kept.
    AbortSweep,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AbortSubSweep => "abort-sub-sweep",
            Self::Continue => "continue",
            Self::AbortSweep => "abort-sweep",
        })
    }
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort-sub-sweep" => Ok(Self::AbortSubSweep),
            "continue" => Ok(Self::Continue),
            "abort-sweep" => Ok(Self::AbortSweep),
            other => Err(Error::Config(format!(
                "unknown failure policy `{other}` (expected `abort-sub-sweep`, `continue` or `abort-sweep`)"
            ))),
        }
    }
}

/// Counters and failures from one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    planned: usize,
    attempted: usize,
    succeeded: usize,
    failures: Vec<SweepResult>,
    halted: bool,
}

impl SweepReport {
    /// Points in the plan.
    #[must_use]
    pub const fn planned(&self) -> usize {
        self.planned
    }

    /// Points handed to the trainer.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.attempted
    }

    /// Points that succeeded and were recorded.
    #[must_use]
    pub const fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Points never attempted because a failure aborted their sub-sweep or the sweep.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.planned - self.attempted
    }

    /// Failed points, with status [`SweepStatus::Failure`].
    #[must_use]
    pub fn failures(&self) -> &[SweepResult] {
        &self.failures
    }

    /// Whether [`FailurePolicy::AbortSweep`] stopped the sweep early.
    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }
}

/// Executes sweep plans against a trainer and a results sink.
///
/// Points run strictly one at a time: the trainer claims a whole
/// accelerator, so overlapping runs would contend for it and skew the
/// timings being measured.
///
/// ## Errors vs. failures
///
/// A trainer that cannot be started, or a sink that rejects a write, stops
/// the sweep with an error. A trainer that starts and then fails is
/// logged, left out of the sink, and handled by the [`FailurePolicy`].
#[derive(Debug)]
pub struct SweepDriver<I, S> {
    invoker: I,
    sink: S,
    policy: FailurePolicy,
}

impl<I: TrainerInvoker, S: ResultsSink> SweepDriver<I, S> {
    /// Create a driver with the default [`FailurePolicy::AbortSubSweep`].
    #[must_use]
    pub fn new(invoker: I, sink: S) -> Self {
        Self {
            invoker,
            sink,
            policy: FailurePolicy::default(),
        }
    }

    /// Set the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the failure policy.
    #[must_use]
    pub const fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Get the results sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the driver, returning invoker and sink.
    pub fn into_parts(self) -> (I, S) {
        (self.invoker, self.sink)
    }

    /// Run every point of `plan`, resolving commands with `template`.
    ///
    /// Each point is attempted at most once. Successful points are
    /// appended to the sink in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrainerUnavailable`] or [`Error::SinkWrite`] (and
    /// any other invoker error) as soon as it occurs; nothing after the
    /// failing point runs.
    pub fn run<T: InvocationTemplate + ?Sized>(
        &mut self,
        plan: &SweepPlan,
        template: &T,
    ) -> Result<SweepReport> {
        let mut report = SweepReport {
            planned: plan.len(),
            ..SweepReport::default()
        };
        tracing::info!(
            points = plan.len(),
            ordering = %plan.ordering(),
            on_failure = %self.policy,
            "starting sweep"
        );

        'sweep: for sub_sweep in plan.sub_sweeps() {
            for (offset, point) in sub_sweep.iter().enumerate() {
                let invocation = template.resolve(point);
                let command = invocation.to_string();
                report.attempted += 1;
                tracing::info!(
                    index = report.attempted,
                    total = report.planned,
                    %point,
                    %command,
                    "running sweep point"
                );

                let started = Instant::now();
                let outcome = self.invoker.invoke(&invocation).map_err(|e| {
                    tracing::error!(%point, %command, error = %e, "sweep aborted");
                    e
                })?;
                let duration_seconds = started.elapsed().as_secs_f64();

                if outcome.exit.is_success() {
                    let result =
                        SweepResult::new(*point, duration_seconds, command, SweepStatus::Success)
                            .with_system_samples(outcome.system_samples);
                    self.sink.append(&result).map_err(|e| {
                        tracing::error!(%point, error = %e, "sweep aborted");
                        e
                    })?;
                    report.succeeded += 1;
                    tracing::info!(%point, duration_seconds, "sweep point recorded");
                    continue;
                }

                tracing::warn!(
                    %point,
                    exit = %outcome.exit,
                    %command,
                    stderr = %outcome.stderr_tail(STDERR_TAIL_LINES),
                    "trainer failed"
                );
                report.failures.push(SweepResult::new(
                    *point,
                    duration_seconds,
                    command,
                    SweepStatus::Failure,
                ));

                match self.policy {
                    FailurePolicy::Continue => {}
                    FailurePolicy::AbortSubSweep => {
                        let remaining = sub_sweep.len() - offset - 1;
                        if remaining > 0 {
                            tracing::warn!(skipped = remaining, "aborting rest of sub-sweep");
                        }
                        continue 'sweep;
                    }
                    FailurePolicy::AbortSweep => {
                        report.halted = true;
                        tracing::warn!(skipped = report.skipped(), "aborting sweep");
                        break 'sweep;
                    }
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failures.len(),
            skipped = report.skipped(),
            "sweep finished"
        );
        Ok(report)
    }
}
