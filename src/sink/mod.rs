//! Results Sink
//!
//! Durable, append-only record of completed sweep points. One line per
//! successful point, never updated or deleted:
//!
//! ```text
//! 128, 3, visual, 850.8827102184296, ./trainer --task TaskB --headless --num_envs 128 --seed 3
//! ```
//!
//! Re-running a sweep appends a second copy of every point; [`dedup`]
//! collapses them again.
//!
//! # Example
//!
//! ```rust
//! use orbit_sweep::sink::{MemorySink, ResultsSink};
//! use orbit_sweep::sweep::{Modality, SweepPoint, SweepResult, SweepStatus};
//!
//! let mut sink = MemorySink::new();
//! let point = SweepPoint::new(4, Modality::State, 0);
//! sink.append(&SweepResult::new(point, 1.5, "./trainer", SweepStatus::Success))?;
//! assert_eq!(sink.len(), 1);
//! # Ok::<(), orbit_sweep::Error>(())
//! ```

mod dedup;
mod file;
mod record;

pub use dedup::{dedup, KeepPolicy};
pub use file::FileSink;
pub use record::{format_record, parse_record, read_records};

use crate::sweep::SweepResult;
use crate::Result;

/// Append-only destination for sweep results.
pub trait ResultsSink {
    /// Append one result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SinkWrite`] if the result could not be
    /// persisted. The driver treats this as fatal.
    fn append(&mut self, result: &SweepResult) -> Result<()>;
}

impl<S: ResultsSink + ?Sized> ResultsSink for &mut S {
    fn append(&mut self, result: &SweepResult) -> Result<()> {
        (**self).append(result)
    }
}

impl<S: ResultsSink + ?Sized> ResultsSink for Box<S> {
    fn append(&mut self, result: &SweepResult) -> Result<()> {
        (**self).append(result)
    }
}

/// Fan out to two sinks, first then second.
impl<A: ResultsSink, B: ResultsSink> ResultsSink for (A, B) {
    fn append(&mut self, result: &SweepResult) -> Result<()> {
        self.0.append(result)?;
        self.1.append(result)
    }
}

/// Sink that keeps results in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<SweepResult>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get appended results in append order.
    #[must_use]
    pub fn records(&self) -> &[SweepResult] {
        &self.records
    }

    /// Number of appended results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take ownership of the appended results.
    #[must_use]
    pub fn into_records(self) -> Vec<SweepResult> {
        self.records
    }
}

impl ResultsSink for MemorySink {
    fn append(&mut self, result: &SweepResult) -> Result<()> {
        self.records.push(result.clone());
        Ok(())
    }
}
