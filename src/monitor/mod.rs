//! Accelerator Utilization Monitor
//!
//! Samples GPU load and memory on a background thread while a trainer
//! runs, so each sweep point can carry the system metrics observed during
//! its own invocation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use orbit_sweep::monitor::{NvidiaSmiProbe, UtilizationMonitor};
//!
//! let monitor = UtilizationMonitor::start(NvidiaSmiProbe::new(), Duration::from_secs(10));
//! // ... run the workload ...
//! let samples = monitor.stop();
//! println!("{} samples", samples.len());
//! ```

mod nvidia;

pub use nvidia::{parse_nvidia_smi_csv, NvidiaSmiProbe};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Metric key for a device's load (fraction in `0.0..=1.0`).
#[must_use]
pub fn utilization_key(gpu_index: u32) -> String {
    format!("system.gpu.{gpu_index}.utilization")
}

/// Metric key for a device's memory in use, in MiB.
#[must_use]
pub fn memory_used_key(gpu_index: u32) -> String {
    format!("system.gpu.{gpu_index}.memoryUsedMB")
}

/// One reading of one device.
///
/// Fields the driver reports as unavailable are stored as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpuSample {
    /// Device index
    pub gpu_index: u32,
    /// Load as a fraction of capacity
    #[serde(with = "crate::tracking::nullable_f64")]
    pub utilization: f64,
    /// Memory in use (MiB)
    #[serde(with = "crate::tracking::nullable_f64")]
    pub memory_used_mb: f64,
    /// Total device memory (MiB)
    #[serde(with = "crate::tracking::nullable_f64")]
    pub memory_total_mb: f64,
    /// Wall-clock time of the reading
    pub timestamp: DateTime<Utc>,
}

impl GpuSample {
    /// Memory in use as a fraction of total, NaN if either is unknown.
    #[must_use]
    pub fn memory_fraction(&self) -> f64 {
        if self.memory_total_mb > 0.0 {
            self.memory_used_mb / self.memory_total_mb
        } else {
            f64::NAN
        }
    }
}

/// Source of utilization readings.
pub trait UtilizationProbe: Send + 'static {
    /// Take one reading of every visible device.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Probe`] if the readings cannot be obtained.
    fn sample(&mut self) -> Result<Vec<GpuSample>>;
}

/// Background sampler; collects readings until [`UtilizationMonitor::stop`].
#[derive(Debug)]
pub struct UtilizationMonitor {
    stopped: Arc<AtomicBool>,
    samples: Arc<Mutex<Vec<GpuSample>>>,
    handle: Option<JoinHandle<()>>,
}

impl UtilizationMonitor {
    /// Start sampling immediately, then once per `interval`.
    ///
    /// Probe errors are logged and sampling continues.
    #[must_use]
    pub fn start<P: UtilizationProbe>(mut probe: P, interval: Duration) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));
        let samples = Arc::new(Mutex::new(Vec::new()));

        let flag = Arc::clone(&stopped);
        let sink = Arc::clone(&samples);
        let handle = thread::spawn(move || {
            let tick = interval.min(Duration::from_millis(50)).max(Duration::from_millis(1));
            while !flag.load(Ordering::Acquire) {
                match probe.sample() {
                    Ok(batch) => {
                        if let Ok(mut guard) = sink.lock() {
                            guard.extend(batch);
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "utilization sample failed"),
                }
                // Sleep in short ticks so stop() returns promptly
                let mut waited = Duration::ZERO;
                while waited < interval && !flag.load(Ordering::Acquire) {
                    thread::sleep(tick);
                    waited += tick;
                }
            }
        });

        Self {
            stopped,
            samples,
            handle: Some(handle),
        }
    }

    /// Stop sampling and return every reading taken.
    #[must_use]
    pub fn stop(mut self) -> Vec<GpuSample> {
        self.shutdown();
        self.samples
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }

    fn shutdown(&mut self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("utilization monitor thread panicked");
            }
        }
    }
}

impl Drop for UtilizationMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Render readings as a small table, one row per sample.
#[must_use]
pub fn format_utilization(samples: &[GpuSample]) -> String {
    let mut out = String::from("| ID | GPU | MEM |\n------------------\n");
    for s in samples {
        out.push_str(&format!(
            "| {:>2} | {:>3.0}% | {:>3.0}% |\n",
            s.gpu_index,
            s.utilization * 100.0,
            s.memory_fraction() * 100.0
        ));
    }
    out
}
