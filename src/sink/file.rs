//! Line-oriented results file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{format_record, ResultsSink};
use crate::sweep::SweepResult;
use crate::{Error, Result};

/// Appends one line per result to a file opened in append mode.
///
/// Each line is written with a single `write_all` on an `O_APPEND` handle,
/// so independent sweep processes can share one results file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Open (creating if needed) the results file at `path`.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SinkWrite`] if the file cannot be opened for
    /// appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let sink_err = |source| Error::SinkWrite {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(sink_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(sink_err)?;

        tracing::debug!(path = %path.display(), "opened results file");
        Ok(Self { path, file })
    }

    /// Get the results file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultsSink for FileSink {
    fn append(&mut self, result: &SweepResult) -> Result<()> {
        let mut line = format_record(result);
        if line.contains(['\n', '\r']) {
            return Err(Error::SinkWrite {
                path: self.path.clone(),
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("record for {} contains a line break", result.point()),
                ),
            });
        }
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| Error::SinkWrite {
                path: self.path.clone(),
                source,
            })
    }
}
