//! Results file line format.
//!
//! ```text
//! <environment_count>, <seed>, <modality>, <duration_seconds>, <command>
//! ```

use std::io::BufRead;

use crate::sweep::{SweepPoint, SweepResult, SweepStatus};
use crate::{Error, Result};

const SEPARATOR: &str = ", ";

/// Format a result as one results-file line (without the newline).
#[must_use]
pub fn format_record(result: &SweepResult) -> String {
    let point = result.point();
    format!(
        "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
        point.environment_count(),
        point.seed(),
        point.modality(),
        result.duration_seconds(),
        result.command()
    )
}

/// Parse one results-file line.
///
/// The command is everything after the fourth separator, so it may itself
/// contain `", "`. Records in the file are always successes.
///
/// # Errors
///
/// Returns [`Error::Parse`] carrying `line_number` when a field is missing
/// or malformed.
pub fn parse_record(line_number: usize, line: &str) -> Result<SweepResult> {
    let bad = |message: String| Error::Parse {
        line: line_number,
        message,
    };

    let mut fields = line.trim_end_matches(['\r', '\n']).splitn(5, SEPARATOR);
    let mut next = |name: &str| {
        fields
            .next()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| bad(format!("missing field `{name}`")))
    };

    let environment_count: u32 = next("environment_count")?
        .parse()
        .map_err(|e| bad(format!("environment_count: {e}")))?;
    let seed: u64 = next("seed")?
        .parse()
        .map_err(|e| bad(format!("seed: {e}")))?;
    let modality = next("modality")?
        .parse()
        .map_err(|e: Error| bad(e.to_string()))?;
    let duration_seconds: f64 = next("duration_seconds")?
        .parse()
        .map_err(|e| bad(format!("duration_seconds: {e}")))?;
    let command = next("command")?.to_string();

    if environment_count == 0 {
        return Err(bad("environment_count must be positive".to_string()));
    }
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(bad(format!("invalid duration {duration_seconds}")));
    }

    Ok(SweepResult::new(
        SweepPoint::new(environment_count, modality, seed),
        duration_seconds,
        command,
        SweepStatus::Success,
    ))
}

/// Parse every non-blank line of a results file.
///
/// # Errors
///
/// Returns [`Error::Io`] on read failure or [`Error::Parse`] on the first
/// malformed line.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<SweepResult>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_record(idx + 1, &line)?);
    }
    Ok(records)
}
