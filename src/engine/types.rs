//! Engine types
//!
//! Summaries reported by the fetch engine.

use crate::types::{OutputFormat, RunMode, Timestamp};
use crate::verify::VerificationReport;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of the verification pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verification {
    /// The artifact was read back and counted
    Counted(VerificationReport),
    /// The artifact could not be read or parsed
    Unreadable {
        /// Why counting failed
        message: String,
    },
    /// Verification was turned off
    Skipped,
}

impl Verification {
    /// Records counted, if the pass succeeded
    pub fn records(&self) -> Option<u64> {
        match self {
            Self::Counted(report) => Some(report.records),
            _ => None,
        }
    }
}

/// Statistics from one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// How the data was downloaded
    pub mode: RunMode,
    /// Format of the artifact
    pub format: OutputFormat,
    /// Where the artifact was written
    pub output_path: PathBuf,
    /// Page requests issued (zero for streamed runs)
    pub pages_fetched: u64,
    /// Bytes written to the artifact
    pub bytes_written: u64,
    /// Record count reported upstream, when known
    pub expected_total: Option<u64>,
    /// Lower bound of an incremental run
    pub changed_since: Option<Timestamp>,
    /// Verification result
    pub verification: Verification,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    /// Empty summary for a run that is about to start
    pub fn new(
        mode: RunMode,
        format: OutputFormat,
        output_path: PathBuf,
        changed_since: Option<Timestamp>,
    ) -> Self {
        Self {
            mode,
            format,
            output_path,
            pages_fetched: 0,
            bytes_written: 0,
            expected_total: None,
            changed_since,
            verification: Verification::Skipped,
            duration_ms: 0,
        }
    }

    /// Records counted by verification
    pub fn verified_records(&self) -> Option<u64> {
        self.verification.records()
    }

    /// Whether the verified count equals the expected total.
    ///
    /// `None` when either side is unknown.
    pub fn is_complete(&self) -> Option<bool> {
        Some(self.verified_records()? == self.expected_total?)
    }
}

/// Result of an incremental update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The dataset has not been refreshed since the last run; nothing fetched
    UpToDate {
        /// Last successful run
        last_run: Timestamp,
    },
    /// New or refreshed records were downloaded
    Updated(RunSummary),
}
