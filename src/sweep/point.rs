//! Sweep Point - one planned unit of work

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Input representation the trainer uses for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Low-dimensional simulator state observations.
    State,
    /// Rendered camera observations.
    Visual,
}

impl Modality {
    /// Both modalities, state first.
    pub const ALL: [Self; 2] = [Self::State, Self::Visual];

    /// Lowercase name as written to the results file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Visual => "visual",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "state" => Ok(Self::State),
            "visual" | "camera" => Ok(Self::Visual),
            other => Err(Error::Config(format!(
                "unknown modality `{other}` (expected `state` or `visual`)"
            ))),
        }
    }
}

/// One concrete (environment count, modality, seed) combination.
///
/// The triple is the point's identity: a plan never contains two points
/// with the same triple, and duplicate records in a results file are
/// collapsed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SweepPoint {
    environment_count: u32,
    modality: Modality,
    seed: u64,
}

impl SweepPoint {
    /// Create a new sweep point.
    ///
    /// # Arguments
    ///
    /// * `environment_count` - Parallel simulation instances to request
    /// * `modality` - Task variant to run
    /// * `seed` - Random seed passed to the trainer
    #[must_use]
    pub const fn new(environment_count: u32, modality: Modality, seed: u64) -> Self {
        Self {
            environment_count,
            modality,
            seed,
        }
    }

    /// Get the number of parallel environments.
    #[must_use]
    pub const fn environment_count(&self) -> u32 {
        self.environment_count
    }

    /// Get the modality.
    #[must_use]
    pub const fn modality(&self) -> Modality {
        self.modality
    }

    /// Get the seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Identity triple used for de-duplication.
    #[must_use]
    pub const fn key(&self) -> (u32, Modality, u64) {
        (self.environment_count, self.modality, self.seed)
    }

    /// Stable run identifier, e.g. `n128-visual-s3`.
    #[must_use]
    pub fn run_id(&self) -> String {
        format!(
            "n{}-{}-s{}",
            self.environment_count, self.modality, self.seed
        )
    }
}

impl fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "num_envs={} modality={} seed={}",
            self.environment_count, self.modality, self.seed
        )
    }
}
