//! Run configuration
//!
//! [`FetchConfig`] gathers every knob of a download run. All fields have
//! defaults, so a YAML/JSON file only needs the values that differ:
//!
//! ```yaml
//! dataset_name: FemaWebDisasterDeclarations
//! dataset_version: 1
//! output_format: csv
//! output_path: ./out.csv
//! page_size: 1000
//! ```

use crate::error::{Error, Result};
use crate::output::DEFAULT_GEOMETRY_FIELD;
use crate::types::{OptionStringExt, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default API root
pub const DEFAULT_ENDPOINT: &str = "https://www.fema.gov/api/open";

/// Largest `$top` the upstream honours per request
pub const DEFAULT_PAGE_SIZE: u32 = 10_000;

// ============================================================================
// Fetch Config
// ============================================================================

/// Complete configuration for one download run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// API root, e.g. `https://www.fema.gov/api/open`
    pub endpoint: String,

    /// Dataset (entity) name, e.g. `DisasterDeclarationsSummaries`
    pub dataset_name: String,

    /// Dataset version, used as the `v{n}` path segment
    pub dataset_version: u32,

    /// Fields for `$select` (empty = all fields)
    pub select_fields: Vec<String>,

    /// Raw OData filter expression for `$filter`
    pub filter_expr: Option<String>,

    /// `$orderby` clause
    pub order_by: Option<String>,

    /// Format of the artifact
    pub output_format: OutputFormat,

    /// Destination file (defaults to `out.<ext>`)
    pub output_path: Option<PathBuf>,

    /// Append-only run log used for incremental runs
    pub log_path: Option<PathBuf>,

    /// Records per page request
    pub page_size: u32,

    /// Optional client-side pacing of page requests
    pub requests_per_second: Option<u32>,

    /// Longest wait, in seconds, for a connection or for the next bytes of a
    /// response. A download that keeps receiving data is never cut off.
    pub timeout_secs: u64,

    /// Field holding GeoJSON geometry for the GeoJSON export
    pub geometry_field: String,

    /// Run the verification pass after writing
    pub verify: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            dataset_name: "DisasterDeclarationsSummaries".to_string(),
            dataset_version: 2,
            select_fields: Vec::new(),
            filter_expr: None,
            order_by: None,
            output_format: OutputFormat::default(),
            output_path: None,
            log_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            requests_per_second: None,
            timeout_secs: 300,
            geometry_field: DEFAULT_GEOMETRY_FIELD.to_string(),
            verify: true,
        }
    }
}

impl FetchConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config file. `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse a YAML config
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that cannot be expressed in the type
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }
        if self.dataset_name.trim().is_empty() {
            return Err(Error::invalid_value("dataset_name", "must not be empty"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(Error::invalid_value("endpoint", "must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be positive"));
        }
        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "requests_per_second",
                "must be positive when set",
            ));
        }
        self.api_root()?;
        Ok(())
    }

    /// Endpoint as a URL with a trailing slash so relative joins append
    fn api_root(&self) -> Result<Url> {
        let root = format!("{}/", self.endpoint.trim().trim_end_matches('/'));
        Ok(Url::parse(&root)?)
    }

    /// `{endpoint}/v{version}/{dataset}`
    pub fn dataset_url(&self) -> Result<Url> {
        let path = format!("v{}/{}", self.dataset_version, self.dataset_name.trim());
        Ok(self.api_root()?.join(&path)?)
    }

    /// `{endpoint}/v{version}/{dataset}.parquet`
    pub fn parquet_url(&self) -> Result<Url> {
        let path = format!(
            "v{}/{}.parquet",
            self.dataset_version,
            self.dataset_name.trim()
        );
        Ok(self.api_root()?.join(&path)?)
    }

    /// `{endpoint}/v1/DataSets`, the catalog of dataset refresh dates
    pub fn datasets_url(&self) -> Result<Url> {
        Ok(self.api_root()?.join("v1/DataSets")?)
    }

    /// `$select` clause, if any fields were chosen
    pub fn select_clause(&self) -> Option<String> {
        let fields: Vec<&str> = self
            .select_fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            None
        } else {
            Some(fields.join(","))
        }
    }

    /// `$filter` clause, if non-blank
    pub fn filter_clause(&self) -> Option<String> {
        self.filter_expr.clone().none_if_empty()
    }

    /// `$orderby` clause, if non-blank
    pub fn order_clause(&self) -> Option<String> {
        self.order_by.clone().none_if_empty()
    }

    /// Destination of the artifact
    pub fn resolved_output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("out.{}", self.output_format.extension())))
    }

    /// Idle timeout for connecting and for each body read
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
