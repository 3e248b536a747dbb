//! Duration summaries over a results file
//!
//! Groups records by modality and environment count and reports how
//! training time scales with the number of parallel environments.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::sweep::{Modality, SweepResult};

/// Duration statistics for one (modality, environment count) group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationSummary {
    /// Modality of the group
    pub modality: Modality,
    /// Environment count of the group
    pub environment_count: u32,
    /// Number of records (seeds) in the group
    pub runs: usize,
    /// Mean duration in seconds
    pub mean_seconds: f64,
    /// Sample standard deviation (0 for a single run)
    pub std_seconds: f64,
    /// Fastest run
    pub min_seconds: f64,
    /// Slowest run
    pub max_seconds: f64,
}

/// Summarize records, sorted by modality then environment count.
///
/// Records are taken as given; de-duplicate first if the file holds
/// several sweeps.
#[must_use]
pub fn summarize(records: &[SweepResult]) -> Vec<DurationSummary> {
    let mut groups: BTreeMap<(Modality, u32), Vec<f64>> = BTreeMap::new();
    for record in records {
        let point = record.point();
        groups
            .entry((point.modality(), point.environment_count()))
            .or_default()
            .push(record.duration_seconds());
    }

    groups
        .into_iter()
        .map(|((modality, environment_count), durations)| {
            #[allow(clippy::cast_precision_loss)]
            let n = durations.len() as f64;
            let mean = durations.iter().sum::<f64>() / n;
            let std = if durations.len() > 1 {
                (durations.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
            } else {
                0.0
            };
            DurationSummary {
                modality,
                environment_count,
                runs: durations.len(),
                mean_seconds: mean,
                std_seconds: std,
                min_seconds: durations.iter().copied().fold(f64::INFINITY, f64::min),
                max_seconds: durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}

/// Render summaries as an aligned text table.
#[must_use]
pub fn format_table(summaries: &[DurationSummary]) -> String {
    let mut out = format!(
        "{:<8} {:>9} {:>5} {:>12} {:>10} {:>12} {:>12}\n",
        "modality", "num_envs", "runs", "mean_s", "std_s", "min_s", "max_s"
    );
    for s in summaries {
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "{:<8} {:>9} {:>5} {:>12.2} {:>10.2} {:>12.2} {:>12.2}",
            s.modality.as_str(),
            s.environment_count,
            s.runs,
            s.mean_seconds,
            s.std_seconds,
            s.min_seconds,
            s.max_seconds
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::{SweepPoint, SweepStatus};

    fn record(n: u32, modality: Modality, seed: u64, secs: f64) -> SweepResult {
        SweepResult::new(
            SweepPoint::new(n, modality, seed),
            secs,
            "./trainer",
            SweepStatus::Success,
        )
    }

    #[test]
    fn test_groups_and_statistics() {
        let records = vec![
            record(2, Modality::Visual, 0, 10.0),
            record(1, Modality::State, 0, 4.0),
            record(1, Modality::State, 1, 6.0),
        ];
        let summaries = summarize(&records);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].modality, Modality::State);
        assert_eq!(summaries[0].runs, 2);
        assert!((summaries[0].mean_seconds - 5.0).abs() < 1e-12);
        assert!((summaries[0].std_seconds - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((summaries[1].std_seconds).abs() < f64::EPSILON);
        assert!((summaries[1].max_seconds - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_table_has_row_per_group() {
        let table = format_table(&summarize(&[record(8, Modality::State, 0, 1.0)]));
        assert_eq!(table.lines().count(), 2);
        assert!(table.lines().nth(1).unwrap().starts_with("state"));
    }
}
