//! Sweep Plan - deterministic cartesian product of sweep parameters

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Modality, SweepPoint};
use crate::{Error, Result};

/// Loop nesting used to enumerate a plan.
///
/// Ordering changes only the sequence of points, never the set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepOrdering {
    /// For each environment count, for each modality, for each seed.
    #[default]
    ModalityMajor,
    /// For each seed, for each environment count, for each modality.
    SeedMajor,
}

impl fmt::Display for SweepOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ModalityMajor => "modality-major",
            Self::SeedMajor => "seed-major",
        })
    }
}

impl FromStr for SweepOrdering {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "modality-major" => Ok(Self::ModalityMajor),
            "seed-major" => Ok(Self::SeedMajor),
            other => Err(Error::Config(format!(
                "unknown ordering `{other}` (expected `modality-major` or `seed-major`)"
            ))),
        }
    }
}

/// Ordered sequence of sweep points.
///
/// ## Sub-sweeps
///
/// Consecutive points that differ only in the innermost parameter form a
/// sub-sweep: seeds under [`SweepOrdering::ModalityMajor`], modalities under
/// [`SweepOrdering::SeedMajor`]. A failing point can abort the rest of its
/// sub-sweep without touching the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    points: Vec<SweepPoint>,
    ordering: SweepOrdering,
    inner_len: usize,
}

impl SweepPlan {
    /// Build the plan for the given parameter lists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any list is empty, an environment count
    /// is zero, or a list repeats a value (which would repeat a triple).
    pub fn new(
        environment_counts: &[u32],
        modalities: &[Modality],
        seeds: &[u64],
        ordering: SweepOrdering,
    ) -> Result<Self> {
        check_list("environment_counts", environment_counts)?;
        check_list("modalities", modalities)?;
        check_list("seeds", seeds)?;
        if environment_counts.contains(&0) {
            return Err(Error::Config(
                "environment_counts must be positive (found 0)".to_string(),
            ));
        }

        let mut points =
            Vec::with_capacity(environment_counts.len() * modalities.len() * seeds.len());
        let inner_len = match ordering {
            SweepOrdering::ModalityMajor => {
                for &n in environment_counts {
                    for &modality in modalities {
                        for &seed in seeds {
                            points.push(SweepPoint::new(n, modality, seed));
                        }
                    }
                }
                seeds.len()
            }
            SweepOrdering::SeedMajor => {
                for &seed in seeds {
                    for &n in environment_counts {
                        for &modality in modalities {
                            points.push(SweepPoint::new(n, modality, seed));
                        }
                    }
                }
                modalities.len()
            }
        };

        Ok(Self {
            points,
            ordering,
            inner_len,
        })
    }

    /// Get the points in execution order.
    #[must_use]
    pub fn points(&self) -> &[SweepPoint] {
        &self.points
    }

    /// Get the ordering the plan was built with.
    #[must_use]
    pub const fn ordering(&self) -> SweepOrdering {
        self.ordering
    }

    /// Number of points in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the plan has no points (never true for a validated plan).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over sub-sweeps in execution order.
    pub fn sub_sweeps(&self) -> impl Iterator<Item = &[SweepPoint]> {
        self.points.chunks(self.inner_len)
    }
}

fn check_list<T: Eq + Hash + fmt::Debug>(name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(Error::Config(format!("{name} must not be empty")));
    }
    let mut seen = HashSet::with_capacity(values.len());
    for value in values {
        if !seen.insert(value) {
            return Err(Error::Config(format!("{name} repeats {value:?}")));
        }
    }
    Ok(())
}
