//! Run log implementation
//!
//! Plain text, one timestamp per line, append-only. Only the last non-empty
//! line matters.

use crate::error::{Error, Result};
use crate::types::Timestamp;
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Secondary accepted form, e.g. `2024-03-01 12:30:00.123456+00:00`
const SPACED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// Record of successful runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Log stored at `path`; nothing is read or created yet
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timestamp of the last successful run.
    ///
    /// `Ok(None)` when the log is absent or holds no entries. A log that
    /// cannot be read, or whose last entry is not a timestamp, is an
    /// [`Error::LogReadFailure`].
    pub async fn try_last_run(&self) -> Result<Option<Timestamp>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.read_failure(e.to_string())),
        };

        let Some(line) = contents.lines().map(str::trim).rfind(|l| !l.is_empty()) else {
            return Ok(None);
        };

        parse_timestamp(line)
            .map(Some)
            .ok_or_else(|| self.read_failure(format!("last entry is not a timestamp: {line:?}")))
    }

    /// Like [`RunLog::try_last_run`], but an unreadable log counts as
    /// "never run"
    pub async fn last_run(&self) -> Option<Timestamp> {
        match self.try_last_run().await {
            Ok(last) => last,
            Err(e) => {
                warn!("Ignoring run log: {e}; running from scratch");
                None
            }
        }
    }

    /// Append one entry, leaving existing bytes untouched
    pub async fn append(&self, at: Timestamp) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.write_failure(e.to_string()))?;

        let mut line = String::new();
        if ends_unterminated(&mut file)
            .await
            .map_err(|e| self.write_failure(e.to_string()))?
        {
            line.push('\n');
        }
        line.push_str(&format_timestamp(at));
        line.push('\n');

        // Append mode writes at the end whatever the read position.
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.write_failure(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| self.write_failure(e.to_string()))?;

        debug!("Recorded run at {} in {}", line.trim(), self.path.display());
        Ok(())
    }

    fn read_failure(&self, message: String) -> Error {
        Error::log_read(self.path.display().to_string(), message)
    }

    fn write_failure(&self, message: String) -> Error {
        Error::sink(self.path.display().to_string(), message)
    }
}

/// Whether a non-empty file lacks a final newline; reads only its last byte
async fn ends_unterminated(file: &mut tokio::fs::File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

/// Format used for new entries
pub fn format_timestamp(at: Timestamp) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an entry written by this tool or by older tooling
pub fn parse_timestamp(line: &str) -> Option<Timestamp> {
    let line = line.trim();
    DateTime::parse_from_rfc3339(line)
        .or_else(|_| DateTime::parse_from_str(line, SPACED_FORMAT))
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
