//! `nvidia-smi` backed probe.

use std::process::Command;

use chrono::{DateTime, Utc};

use super::{GpuSample, UtilizationProbe};
use crate::{Error, Result};

const QUERY_ARGS: [&str; 2] = [
    "--query-gpu=index,utilization.gpu,memory.used,memory.total",
    "--format=csv,noheader,nounits",
];

/// Reads utilization by shelling out to `nvidia-smi` (no shell involved).
#[derive(Debug, Clone)]
pub struct NvidiaSmiProbe {
    program: String,
}

impl NvidiaSmiProbe {
    /// Probe using `nvidia-smi` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("nvidia-smi")
    }

    /// Probe using an explicit binary path.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl UtilizationProbe for NvidiaSmiProbe {
    fn sample(&mut self) -> Result<Vec<GpuSample>> {
        let output = Command::new(&self.program)
            .args(QUERY_ARGS)
            .output()
            .map_err(|e| Error::Probe(format!("{}: {e}", self.program)))?;
        if !output.status.success() {
            return Err(Error::Probe(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_nvidia_smi_csv(&String::from_utf8_lossy(&output.stdout), Utc::now())
    }
}

/// Parse `index, utilization %, memory used MiB, memory total MiB` rows.
///
/// Values the driver reports as `[N/A]` become NaN. Utilization is
/// converted from percent to a fraction.
///
/// # Errors
///
/// Returns [`Error::Probe`] on a row with the wrong number of columns or
/// an unparseable number.
pub fn parse_nvidia_smi_csv(text: &str, timestamp: DateTime<Utc>) -> Result<Vec<GpuSample>> {
    let mut samples = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let cols: Vec<&str> = line.split(',').map(str::trim).collect();
        if cols.len() != 4 {
            return Err(Error::Probe(format!("unexpected row `{line}`")));
        }
        let gpu_index = cols[0]
            .parse()
            .map_err(|_| Error::Probe(format!("bad GPU index `{}`", cols[0])))?;
        samples.push(GpuSample {
            gpu_index,
            utilization: parse_value(cols[1])? / 100.0,
            memory_used_mb: parse_value(cols[2])?,
            memory_total_mb: parse_value(cols[3])?,
            timestamp,
        });
    }
    Ok(samples)
}

fn parse_value(raw: &str) -> Result<f64> {
    if raw.contains("N/A") {
        return Ok(f64::NAN);
    }
    raw.parse()
        .map_err(|_| Error::Probe(format!("bad value `{raw}`")))
}
