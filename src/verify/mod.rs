//! Verification module
//!
//! Re-reads a finished artifact and counts its records.
//!
//! # Overview
//!
//! Verification is read-only and idempotent: the count comes from the file
//! alone, never from what the upstream reported. The caller compares it with
//! the expected total.
//!
//! | Layout | Count |
//! |---|---|
//! | [`ArtifactLayout::Lines`] | newline-terminated lines |
//! | [`ArtifactLayout::CsvTable`] | CSV records minus the header |
//! | [`ArtifactLayout::JsonArray`] | top-level array length |
//! | [`ArtifactLayout::JsonCollection`] | length of the array under a key |
//! | [`ArtifactLayout::Parquet`] | rows over all record batches |

mod counters;

pub use counters::{count_csv_records, count_json_array, count_json_collection, count_lines};

use crate::error::{Error, Result};
use crate::types::OutputFormat;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key holding the features of a GeoJSON `FeatureCollection`
pub const GEOJSON_FEATURES_KEY: &str = "features";

/// Shape of an artifact on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactLayout {
    /// One record per line
    Lines,
    /// CSV with a header line
    CsvTable,
    /// Top-level JSON array
    JsonArray,
    /// JSON object with the records under a key
    JsonCollection(String),
    /// Parquet file
    Parquet,
}

impl ArtifactLayout {
    /// Layout produced for `format`; JSON wraps records under the dataset name
    pub fn for_format(format: OutputFormat, dataset_name: &str) -> Self {
        match format {
            OutputFormat::Json => Self::JsonCollection(dataset_name.to_string()),
            OutputFormat::Jsona => Self::JsonArray,
            OutputFormat::Jsonl => Self::Lines,
            OutputFormat::Csv => Self::CsvTable,
            OutputFormat::Parquet => Self::Parquet,
        }
    }

    /// Layout of a GeoJSON `FeatureCollection`
    pub fn geojson() -> Self {
        Self::JsonCollection(GEOJSON_FEATURES_KEY.to_string())
    }
}

/// Result of one verification pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Artifact that was read
    pub path: PathBuf,
    /// Layout it was read as
    pub layout: ArtifactLayout,
    /// Records found
    pub records: u64,
}

impl VerificationReport {
    /// Whether the artifact holds exactly `expected` records
    pub fn matches(&self, expected: u64) -> bool {
        self.records == expected
    }
}

/// Count the records in the artifact at `path`.
///
/// Any read or parse failure is reported as [`Error::MalformedArtifact`].
pub fn verify_artifact(
    path: impl AsRef<Path>,
    layout: &ArtifactLayout,
) -> Result<VerificationReport> {
    let path = path.as_ref();
    let malformed = |message: String| Error::malformed(path.display().to_string(), message);

    let file = File::open(path).map_err(|e| malformed(e.to_string()))?;

    let counted = match layout {
        ArtifactLayout::Lines => count_lines(BufReader::new(file)).map_err(|e| e.to_string()),
        ArtifactLayout::CsvTable => count_csv_records(BufReader::new(file))
            .map(|records| records.saturating_sub(1))
            .map_err(|e| e.to_string()),
        ArtifactLayout::JsonArray => {
            count_json_array(BufReader::new(file)).map_err(|e| e.to_string())
        }
        ArtifactLayout::JsonCollection(key) => {
            count_json_collection(BufReader::new(file), key).map_err(|e| e.to_string())
        }
        ArtifactLayout::Parquet => count_parquet_rows(file).map_err(|e| e.to_string()),
    };
    let records = counted.map_err(malformed)?;

    debug!("Verified {}: {records} records", path.display());
    Ok(VerificationReport {
        path: path.to_path_buf(),
        layout: layout.clone(),
        records,
    })
}

fn count_parquet_rows(file: File) -> Result<u64> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut rows = 0u64;
    for batch in reader {
        rows += batch?.num_rows() as u64;
    }
    Ok(rows)
}
