//! Error types for orbit-sweep
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Only fatal conditions are errors. A trainer that exits non-zero is an
//! ordinary outcome (see [`crate::invoker::ExitState`]) handled by the
//! sweep's failure policy.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// orbit-sweep error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed sweep parameters, rejected before any invocation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Trainer program missing or not executable (aborts the whole sweep)
    #[error("Trainer `{program}` could not be started: {source}\nCheck the path and that the file is executable")]
    TrainerUnavailable {
        /// Program that failed to spawn
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// Results file could not accept a write (aborts the whole sweep)
    #[error("Results sink `{}` is not writable: {source}\nNo result was dropped; the sweep halted", path.display())]
    SinkWrite {
        /// Path of the results file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Results file line could not be parsed
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        message: String,
    },

    /// Utilization probe failed
    #[error("Utilization probe failed: {0}")]
    Probe(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (tracking store) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML (sweep config) error
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error was caused by invalid sweep configuration.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Toml(_))
    }
}
