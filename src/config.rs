//! Sweep configuration
//!
//! A sweep is described by a TOML file; every field has a default, and
//! command-line flags override file values. Nothing here is global: each
//! [`SweepConfig`] is a self-contained value handed to the driver.
//!
//! ```toml
//! experiment = "state-vs-visual"
//!
//! [sweep]
//! environment_counts = [1, 2, 4, 8]
//! modalities = ["state", "visual"]
//! seeds = [0, 1, 2]
//! ordering = "modality-major"
//! on_failure = "abort-sub-sweep"
//!
//! [trainer]
//! program = "./orbit.sh"
//! args = ["-p", "source/standalone/workflows/skrl/train.py", "--task", "{task}",
//!         "--headless", "--num_envs", "{num_envs}", "--seed", "{seed}"]
//! timeout_secs = 7200
//!
//! [output]
//! results = "time_state_vs_visual_sim.txt"
//! tracking = "tracking.json"
//!
//! [monitor]
//! interval_secs = 10
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::invoker::{CommandTemplate, TaskNames, DEFAULT_ARGS, DEFAULT_PROGRAM};
use crate::sweep::{FailurePolicy, Modality, SweepOrdering, SweepPlan};
use crate::{Error, Result};

/// Complete description of one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Experiment name used by the tracking store
    pub experiment: String,
    /// Parameter lists and policies
    pub sweep: SweepSection,
    /// Trainer command
    pub trainer: TrainerSection,
    /// Output files
    pub output: OutputSection,
    /// Utilization monitoring
    pub monitor: MonitorSection,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            experiment: "state-vs-visual".to_string(),
            sweep: SweepSection::default(),
            trainer: TrainerSection::default(),
            output: OutputSection::default(),
            monitor: MonitorSection::default(),
        }
    }
}

/// `[sweep]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepSection {
    /// Environment counts to sweep
    pub environment_counts: Vec<u32>,
    /// Modalities to sweep
    pub modalities: Vec<Modality>,
    /// Seeds to sweep
    pub seeds: Vec<u64>,
    /// Loop nesting
    pub ordering: SweepOrdering,
    /// Reaction to a failed trainer run
    pub on_failure: FailurePolicy,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            environment_counts: vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 512],
            modalities: Modality::ALL.to_vec(),
            seeds: vec![0, 1, 2, 3, 4],
            ordering: SweepOrdering::default(),
            on_failure: FailurePolicy::default(),
        }
    }
}

/// `[trainer]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerSection {
    /// Trainer program
    pub program: String,
    /// Argument tokens with placeholders
    pub args: Vec<String>,
    /// Task name per modality
    pub tasks: TaskNames,
    /// Kill a run after this many seconds (unset: wait forever)
    pub timeout_secs: Option<u64>,
}

impl Default for TrainerSection {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: DEFAULT_ARGS.iter().map(ToString::to_string).collect(),
            tasks: TaskNames::default(),
            timeout_secs: None,
        }
    }
}

/// `[output]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Append-only results file
    pub results: PathBuf,
    /// Tracking store (unset: no tracking)
    pub tracking: Option<PathBuf>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            results: PathBuf::from("time_state_vs_visual_sim.txt"),
            tracking: None,
        }
    }
}

/// `[monitor]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSection {
    /// Seconds between utilization samples (unset: monitoring off)
    pub interval_secs: Option<f64>,
}

impl SweepConfig {
    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toml`] on malformed TOML or unknown fields.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the path if the file is unreadable,
    /// or [`Error::Toml`] if it is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Build the sweep plan.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for empty, zero, or repeated parameters.
    pub fn plan(&self) -> Result<SweepPlan> {
        SweepPlan::new(
            &self.sweep.environment_counts,
            &self.sweep.modalities,
            &self.sweep.seeds,
            self.sweep.ordering,
        )
    }

    /// Build the trainer command template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty program or unknown placeholder.
    pub fn command_template(&self) -> Result<CommandTemplate> {
        CommandTemplate::new(
            self.trainer.program.clone(),
            self.trainer.args.clone(),
            self.trainer.tasks.clone(),
        )
    }

    /// Per-run timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.trainer.timeout_secs.map(Duration::from_secs)
    }

    /// Interval between utilization samples, if monitoring is on.
    #[must_use]
    pub fn monitor_interval(&self) -> Option<Duration> {
        self.monitor
            .interval_secs
            .and_then(|secs| positive_seconds("monitor.interval_secs", secs).ok())
    }

    /// Check everything that can be checked before the first invocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.plan()?;
        self.command_template()?;
        if self.trainer.timeout_secs == Some(0) {
            return Err(Error::Config("trainer.timeout_secs must be positive".to_string()));
        }
        if let Some(interval) = self.monitor.interval_secs {
            positive_seconds("monitor.interval_secs", interval)?;
        }
        if self.output.results.as_os_str().is_empty() {
            return Err(Error::Config("output.results must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Upper bound on the values one list item may expand to.
pub const MAX_RANGE_LEN: u64 = 1_000_000;

/// Convert a positive, representable number of seconds to a [`Duration`].
///
/// # Errors
///
/// Returns [`Error::Config`] naming `field` for NaN, non-positive, or
/// out-of-range values.
pub fn positive_seconds(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            Error::Config(format!("{field} must be a positive number of seconds (found {secs})"))
        })
}

/// Parse a comma-separated integer list.
///
/// Each item is `N`, `A..B` (exclusive), `A..=B` (inclusive), or a
/// geometric range `A..=B*F` / `A..B*F` multiplying by `F` from `A`.
///
/// ```rust
/// use orbit_sweep::config::parse_int_list;
///
/// assert_eq!(parse_int_list("1..=16*2").unwrap(), vec![1, 2, 4, 8, 16]);
/// assert_eq!(parse_int_list("0..3, 7").unwrap(), vec![0, 1, 2, 7]);
/// ```
///
/// # Errors
///
/// Returns [`Error::Config`] on malformed items, a factor below 2, a
/// geometric range starting at 0, a range longer than [`MAX_RANGE_LEN`],
/// or an empty result.
pub fn parse_int_list(text: &str) -> Result<Vec<u64>> {
    let bad = |item: &str, why: &str| Error::Config(format!("bad list item `{item}`: {why}"));
    let number = |item: &str, raw: &str| {
        raw.trim()
            .parse::<u64>()
            .map_err(|e| bad(item, &e.to_string()))
    };

    let mut values = Vec::new();
    for item in text.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        let Some((start, rest)) = item.split_once("..") else {
            values.push(number(item, item)?);
            continue;
        };
        let (inclusive, rest) = rest
            .strip_prefix('=')
            .map_or((false, rest), |r| (true, r));
        let (end, factor) = match rest.split_once('*') {
            Some((end, factor)) => (end, Some(number(item, factor)?)),
            None => (rest, None),
        };
        let (start, end) = (number(item, start)?, number(item, end)?);
        let in_range = |v: u64| if inclusive { v <= end } else { v < end };

        match factor {
            None => {
                let len = end.saturating_sub(start).saturating_add(u64::from(inclusive));
                if len > MAX_RANGE_LEN {
                    return Err(bad(
                        item,
                        &format!("range expands to {len} values (limit {MAX_RANGE_LEN})"),
                    ));
                }
                let mut v = start;
                while in_range(v) {
                    values.push(v);
                    match v.checked_add(1) {
                        Some(next) => v = next,
                        None => break,
                    }
                }
            }
            Some(f) if f < 2 => return Err(bad(item, "factor must be at least 2")),
            Some(_) if start == 0 => return Err(bad(item, "geometric range cannot start at 0")),
            Some(f) => {
                let mut v = start;
                while in_range(v) {
                    values.push(v);
                    match v.checked_mul(f) {
                        Some(next) => v = next,
                        None => break,
                    }
                }
            }
        }
    }

    if values.is_empty() {
        return Err(Error::Config(format!("list `{text}` is empty")));
    }
    Ok(values)
}

/// Parse a comma-separated modality list such as `state,visual`.
///
/// # Errors
///
/// Returns [`Error::Config`] on an unknown modality or an empty list.
pub fn parse_modalities(text: &str) -> Result<Vec<Modality>> {
    let modalities = text
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Modality>>>()?;
    if modalities.is_empty() {
        return Err(Error::Config("modality list is empty".to_string()));
    }
    Ok(modalities)
}
