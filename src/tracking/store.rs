//! Tracking Store - runs and metric histories for one sweep experiment
//!
//! This module provides the storage layer for experiment tracking,
//! optimized for per-run time-series metric queries.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MetricSample, TrackedRun};
use crate::Result;

/// Prefix of metrics derived by [`TrackingStore::backfill_peaks`].
pub const PEAK_PREFIX: &str = "max_";

/// Runs and metric samples for one experiment, persisted as JSON.
///
/// ## Design
///
/// Runs are kept in a `BTreeMap` keyed by run ID for ordered, O(log n)
/// lookups. Samples live in one vector and are filtered and sorted on
/// query, mirroring how a tracking service exposes a run's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingStore {
    experiment: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    config: Option<serde_json::Value>,
    #[serde(default)]
    runs: BTreeMap<String, TrackedRun>,
    #[serde(default)]
    samples: Vec<MetricSample>,
}

impl TrackingStore {
    /// Create an empty store for `experiment`.
    #[must_use]
    pub fn new(experiment: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            created_at: Utc::now(),
            config: None,
            runs: BTreeMap::new(),
            samples: Vec::new(),
        }
    }

    /// Attach the sweep configuration that produced the runs.
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Load a store previously written by [`TrackingStore::save`].
    ///
    /// # Errors
    ///
    /// Returns an IO or JSON error if the file is unreadable or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load the store at `path`, or start a new one if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_or_new(path: impl AsRef<Path>, experiment: &str) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new(experiment))
        }
    }

    /// Write the store as JSON, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Get the experiment name.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Get the attached configuration, if any.
    #[must_use]
    pub const fn config(&self) -> Option<&serde_json::Value> {
        self.config.as_ref()
    }

    /// Number of runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Number of metric samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Add a run, returning its ID.
    ///
    /// A repeated point (from a re-run sweep) gets a `-r2`, `-r3`, ...
    /// suffix so earlier runs are never overwritten.
    pub fn add_run(&mut self, mut run: TrackedRun) -> String {
        let base = run.run_id().to_string();
        let mut run_id = base.clone();
        let mut attempt = 1;
        while self.runs.contains_key(&run_id) {
            attempt += 1;
            run_id = format!("{base}-r{attempt}");
        }
        run.set_run_id(run_id.clone());
        self.runs.insert(run_id.clone(), run);
        run_id
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&TrackedRun> {
        self.runs.get(run_id)
    }

    /// Iterate over runs in ID order.
    pub fn runs(&self) -> impl Iterator<Item = &TrackedRun> {
        self.runs.values()
    }

    /// Record a metric sample.
    pub fn log_sample(&mut self, sample: MetricSample) {
        self.samples.push(sample);
    }

    /// Distinct metric keys recorded for a run.
    #[must_use]
    pub fn metric_keys(&self, run_id: &str) -> BTreeSet<&str> {
        self.samples
            .iter()
            .filter(|s| s.run_id() == run_id)
            .map(MetricSample::key)
            .collect()
    }

    /// History of one metric for one run, ordered by step.
    #[must_use]
    pub fn history(&self, run_id: &str, key: &str) -> Vec<&MetricSample> {
        let mut history: Vec<&MetricSample> = self
            .samples
            .iter()
            .filter(|s| s.run_id() == run_id && s.key() == key)
            .collect();
        history.sort_by_key(|s| s.step());
        history
    }

    /// Derive `max_<key>` for every run that recorded `key`.
    ///
    /// NaN samples are ignored. Runs without the metric, or with only NaN
    /// values for it, are skipped. Each peak is stored both as a run
    /// summary value and as a new sample one step past the metric's last
    /// step, so it can be plotted like any other metric.
    ///
    /// Returns the samples that were logged.
    pub fn backfill_peaks(&mut self, keys: &[&str]) -> Vec<MetricSample> {
        let mut logged = Vec::new();
        let run_ids: Vec<String> = self.runs.keys().cloned().collect();

        for run_id in &run_ids {
            for &key in keys {
                let history = self.history(run_id, key);
                let Some(last_step) = history.last().map(|s| s.step()) else {
                    tracing::debug!(run_id = %run_id, key, "metric not recorded, skipping");
                    continue;
                };
                let Some(peak) = history
                    .iter()
                    .map(|s| s.value())
                    .filter(|v| !v.is_nan())
                    .reduce(f64::max)
                else {
                    tracing::debug!(run_id = %run_id, key, "metric has no values, skipping");
                    continue;
                };

                let peak_key = format!("{PEAK_PREFIX}{key}");
                tracing::info!(run_id = %run_id, key = %peak_key, peak, "backfilled peak");
                if let Some(run) = self.runs.get_mut(run_id) {
                    run.set_summary(peak_key.clone(), peak);
                }
                let sample = MetricSample::new(run_id.as_str(), peak_key, last_step + 1, peak);
                self.samples.push(sample.clone());
                logged.push(sample);
            }
        }
        logged
    }
}
