//! Common types used throughout opendata-fetch
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

/// UTC timestamp used for run log entries and refresh checks
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ============================================================================
// Output Format
// ============================================================================

/// Format of the downloaded artifact.
///
/// The value is sent upstream as `$format`; Parquet is requested through the
/// `.parquet` endpoint suffix instead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object keyed by dataset name, holding the record array
    #[default]
    Json,
    /// A bare JSON array of records
    Jsona,
    /// JSON Lines, one record per line
    Jsonl,
    /// CSV with a single header row
    Csv,
    /// Columnar binary (streamed downloads only)
    Parquet,
}

impl OutputFormat {
    /// Value of the `$format` parameter for an all-records download
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            Self::Json => Some("json"),
            Self::Jsona => Some("jsona"),
            Self::Jsonl => Some("jsonl"),
            Self::Csv => Some("csv"),
            Self::Parquet => None,
        }
    }

    /// Value of the `$format` parameter when fetching page by page.
    ///
    /// Collection-wrapped JSON is assembled locally from JSONA pages so the
    /// per-page wrapper and metadata never reach the artifact.
    pub fn page_query_value(self) -> Option<&'static str> {
        match self {
            Self::Json | Self::Jsona => Some("jsona"),
            Self::Jsonl => Some("jsonl"),
            Self::Csv => Some("csv"),
            Self::Parquet => None,
        }
    }

    /// Whether the format can be fetched page by page
    pub fn supports_paging(self) -> bool {
        self.page_query_value().is_some()
    }

    /// Default file extension
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json | Self::Jsona => "json",
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }

    /// Substrings accepted in the response `Content-Type`
    pub fn accepted_content_types(self) -> &'static [&'static str] {
        match self {
            Self::Json | Self::Jsona | Self::Jsonl => &["json"],
            Self::Csv => &["csv"],
            Self::Parquet => &["parquet", "octet-stream"],
        }
    }

    /// Check a `Content-Type` header value against this format
    pub fn accepts_content_type(self, content_type: &str) -> bool {
        let content_type = content_type.to_ascii_lowercase();
        self.accepted_content_types()
            .iter()
            .any(|accepted| content_type.contains(accepted))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Jsona => "jsona",
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Run Mode
// ============================================================================

/// How the result set is pulled from upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Sequential `$skip`/`$top` pages driven by the metadata count
    #[default]
    Paged,
    /// One `$allrecords=true` response consumed chunk by chunk
    Streamed,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
