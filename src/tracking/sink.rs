//! Results sink that feeds the tracking store.

use std::path::PathBuf;

use chrono::Utc;

use super::{MetricSample, TrackedRun, TrackingStore};
use crate::monitor::{memory_used_key, utilization_key};
use crate::sink::ResultsSink;
use crate::sweep::SweepResult;
use crate::{Error, Result};

/// Records each result as a tracked run plus its system metric history.
///
/// When backed by a file, the store is rewritten after every append so a
/// crashed sweep loses nothing already recorded.
#[derive(Debug)]
pub struct TrackingSink {
    store: TrackingStore,
    path: Option<PathBuf>,
}

impl TrackingSink {
    /// Sink that only keeps the store in memory.
    #[must_use]
    pub const fn in_memory(store: TrackingStore) -> Self {
        Self { store, path: None }
    }

    /// Sink persisted at `path`, continuing any store already there.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be loaded.
    pub fn open(path: impl Into<PathBuf>, experiment: &str) -> Result<Self> {
        let path = path.into();
        let store = TrackingStore::load_or_new(&path, experiment)?;
        Ok(Self {
            store,
            path: Some(path),
        })
    }

    /// Attach sweep configuration to the underlying store.
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.store = self.store.with_config(config);
        self
    }

    /// Get the store.
    #[must_use]
    pub const fn store(&self) -> &TrackingStore {
        &self.store
    }

    /// Consume the sink, returning the store.
    #[must_use]
    pub fn into_store(self) -> TrackingStore {
        self.store
    }
}

impl ResultsSink for TrackingSink {
    fn append(&mut self, result: &SweepResult) -> Result<()> {
        let ended_at = Utc::now();
        let run_id = self.store.add_run(TrackedRun::from_result(result, ended_at));

        self.store.log_sample(MetricSample::at(
            run_id.as_str(),
            "duration_seconds",
            0,
            result.duration_seconds(),
            ended_at,
        ));

        let mut steps = std::collections::HashMap::new();
        for sample in result.system_samples() {
            let step = steps.entry(sample.gpu_index).or_insert(0_u64);
            self.store.log_sample(MetricSample::at(
                run_id.as_str(),
                utilization_key(sample.gpu_index),
                *step,
                sample.utilization,
                sample.timestamp,
            ));
            self.store.log_sample(MetricSample::at(
                run_id.as_str(),
                memory_used_key(sample.gpu_index),
                *step,
                sample.memory_used_mb,
                sample.timestamp,
            ));
            *step += 1;
        }

        if let Some(path) = &self.path {
            self.store.save(path).map_err(|e| Error::SinkWrite {
                path: path.clone(),
                source: match e {
                    Error::Io(source) => source,
                    other => std::io::Error::other(other.to_string()),
                },
            })?;
        }
        Ok(())
    }
}
