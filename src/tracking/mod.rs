//! Experiment Tracking
//!
//! Keeps one tracked run per recorded sweep point, together with the
//! system metrics sampled while it ran, in a JSON file next to the
//! results file.
//!
//! ## Schema Overview
//!
//! ```text
//! TrackingStore (1 experiment) ──< TrackedRun (N)
//!                                      │
//!                                      └──< MetricSample (N) [time-series]
//! ```
//!
//! ## Peak backfill
//!
//! Summary values set after a run has finished are easy to lose in
//! dashboards that only plot logged histories. [`TrackingStore::backfill_peaks`]
//! derives `max_<metric>` from each run's history and logs it as a regular
//! sample.
//!
//! ```rust
//! use orbit_sweep::tracking::{MetricSample, TrackingStore};
//!
//! let mut store = TrackingStore::new("state-vs-visual");
//! store.log_sample(MetricSample::new("n4-state-s0", "system.gpu.0.memoryUsedMB", 0, 900.0));
//! assert!(store.backfill_peaks(&["system.gpu.0.memoryUsedMB"]).is_empty()); // no such run yet
//! ```

mod metric;
mod run;
mod sink;
mod store;

pub(crate) use metric::nullable_f64;
pub use metric::MetricSample;
pub use run::TrackedRun;
pub use sink::TrackingSink;
pub use store::{TrackingStore, PEAK_PREFIX};
