//! Immutable OData query
//!
//! A [`QuerySpec`] is built once per run from a [`FetchConfig`] and never
//! mutated afterwards. It renders the OData parameter sets for the metadata
//! probe, each page request, and the all-records download.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::types::{OutputFormat, StringMap, Timestamp};
use chrono::SecondsFormat;
use url::Url;

/// Field compared against the "changed since" lower bound
pub const CHANGED_SINCE_FIELD: &str = "lastRefresh";

/// Immutable description of what to download
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    dataset_name: String,
    dataset_url: Url,
    parquet_url: Url,
    select: Option<String>,
    filter: Option<String>,
    order_by: Option<String>,
    format: OutputFormat,
    page_size: u32,
    changed_since: Option<Timestamp>,
}

impl QuerySpec {
    /// Build from a validated config
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dataset_name: config.dataset_name.trim().to_string(),
            dataset_url: config.dataset_url()?,
            parquet_url: config.parquet_url()?,
            select: config.select_clause(),
            filter: config.filter_clause(),
            order_by: config.order_clause(),
            format: config.output_format,
            page_size: config.page_size,
            changed_since: None,
        })
    }

    /// Same query restricted to records refreshed after `since`
    #[must_use]
    pub fn with_changed_since(mut self, since: Option<Timestamp>) -> Self {
        self.changed_since = since;
        self
    }

    /// Same query with another page size
    pub fn with_page_size(mut self, page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Dataset name, also the collection key of JSON responses
    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    /// Dataset endpoint
    pub fn dataset_url(&self) -> &Url {
        &self.dataset_url
    }

    /// Requested format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Records per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Lower bound of the incremental filter
    pub fn changed_since(&self) -> Option<Timestamp> {
        self.changed_since
    }

    /// User filter AND-ed with the "changed since" clause
    pub fn effective_filter(&self) -> Option<String> {
        let since = self.changed_since.map(|ts| {
            format!(
                "{CHANGED_SINCE_FIELD} gt '{}'",
                ts.to_rfc3339_opts(SecondsFormat::Millis, true)
            )
        });

        match (&self.filter, since) {
            (Some(filter), Some(since)) => Some(format!("({filter}) and {since}")),
            (Some(filter), None) => Some(filter.clone()),
            (None, Some(since)) => Some(since),
            (None, None) => None,
        }
    }

    /// Parameters for the metadata probe: one record plus the total count
    pub fn probe_params(&self) -> StringMap {
        let mut params = StringMap::new();
        params.insert("$inlinecount".to_string(), "allpages".to_string());
        params.insert("$top".to_string(), "1".to_string());
        params.insert("$format".to_string(), "json".to_string());
        if let Some(select) = &self.select {
            params.insert("$select".to_string(), select.clone());
        }
        if let Some(filter) = self.effective_filter() {
            params.insert("$filter".to_string(), filter);
        }
        params
    }

    /// Parameters for the page starting at `skip`
    pub fn page_params(&self, skip: u64) -> Result<StringMap> {
        let format = self.format.page_query_value().ok_or_else(|| {
            Error::config(format!("{} output cannot be fetched page by page", self.format))
        })?;

        let mut params = self.clause_params();
        params.insert("$format".to_string(), format.to_string());
        params.insert("$metadata".to_string(), "off".to_string());
        params.insert("$skip".to_string(), skip.to_string());
        params.insert("$top".to_string(), self.page_size.to_string());
        Ok(params)
    }

    /// URL and parameters for a single all-records download
    pub fn all_records_request(&self) -> (Url, StringMap) {
        let mut params = self.clause_params();
        params.insert("$allrecords".to_string(), "true".to_string());
        params.insert("$metadata".to_string(), "off".to_string());

        match self.format.query_value() {
            Some(format) => {
                params.insert("$format".to_string(), format.to_string());
                (self.dataset_url.clone(), params)
            }
            None => (self.parquet_url.clone(), params),
        }
    }

    fn clause_params(&self) -> StringMap {
        let mut params = StringMap::new();
        if let Some(select) = &self.select {
            params.insert("$select".to_string(), select.clone());
        }
        if let Some(filter) = self.effective_filter() {
            params.insert("$filter".to_string(), filter);
        }
        if let Some(order_by) = &self.order_by {
            params.insert("$orderby".to_string(), order_by.clone());
        }
        params
    }
}
