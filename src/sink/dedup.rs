//! De-duplication of results gathered over repeated sweeps.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sweep::SweepResult;
use crate::Error;

/// Which occurrence of a repeated point survives de-duplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepPolicy {
    /// Keep the earliest record.
    #[default]
    First,
    /// Keep the most recent record.
    Last,
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Last => "last",
        })
    }
}

impl FromStr for KeepPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(Error::Config(format!(
                "unknown keep policy `{other}` (expected `first` or `last`)"
            ))),
        }
    }
}

/// Keep one record per (environment count, modality, seed).
///
/// Output order follows the first appearance of each point in `records`,
/// whichever occurrence is kept.
#[must_use]
pub fn dedup(records: Vec<SweepResult>, keep: KeepPolicy) -> Vec<SweepResult> {
    let mut slots: HashMap<_, usize> = HashMap::with_capacity(records.len());
    let mut kept: Vec<SweepResult> = Vec::with_capacity(records.len());

    for record in records {
        match slots.get(&record.point().key()) {
            Some(&slot) => {
                if keep == KeepPolicy::Last {
                    kept[slot] = record;
                }
            }
            None => {
                slots.insert(record.point().key(), kept.len());
                kept.push(record);
            }
        }
    }
    kept
}
