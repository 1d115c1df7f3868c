//! Execution engine module
//!
//! Drives one download run from query to verified artifact.
//!
//! # Overview
//!
//! The engine module provides:
//! - `FetchEngine` - Runs paged, streamed, incremental and GeoJSON downloads
//! - `RunSummary` - What a run fetched, wrote and verified
//! - `UpdateOutcome` - Whether an incremental run fetched anything
//!
//! A run is strictly sequential: each page or chunk is written before the
//! next one is requested. The run log is appended only after the artifact is
//! complete, and verification runs last on a blocking thread.

mod types;

pub use types::{RunSummary, UpdateOutcome, Verification};

use crate::config::FetchConfig;
use crate::error::{Error, Result, ResultExt};
use crate::http::{
    check_content_type, transport_error, HttpClient, HttpClientConfig, RateLimiterConfig,
    RequestConfig,
};
use crate::output::{feature_collection, ByteSink, FileSink, PageLayout, PageWriter};
use crate::pagination::{probe_total, PagedFetcher};
use crate::query::QuerySpec;
use crate::state::{parse_timestamp, RunLog};
use crate::types::{JsonValue, OutputFormat, RunMode, Timestamp};
use crate::verify::{verify_artifact, ArtifactLayout};
use chrono::{NaiveDateTime, Utc};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default artifact of the GeoJSON export
pub const DEFAULT_GEOJSON_PATH: &str = "out.geojson";

/// Fetch engine for one configured dataset
#[derive(Debug)]
pub struct FetchEngine {
    /// Validated configuration
    config: FetchConfig,
    /// HTTP client
    client: HttpClient,
    /// Run log, when one is configured
    run_log: Option<RunLog>,
}

impl FetchEngine {
    /// Validate `config` and build the HTTP client it describes
    pub fn new(config: FetchConfig) -> Result<Self> {
        config.validate()?;

        let mut http = HttpClientConfig::builder()
            .connect_timeout(config.idle_timeout())
            .read_timeout(config.idle_timeout());
        if let Some(pacing) = RateLimiterConfig::pacing(config.requests_per_second) {
            debug!("Pacing requests at {} per second", pacing.requests_per_second);
            http = http.rate_limit(pacing);
        }
        let client = HttpClient::with_config(http.build())?;
        let run_log = config.log_path.as_ref().map(RunLog::new);

        Ok(Self {
            config,
            client,
            run_log,
        })
    }

    /// Use a preconfigured HTTP client
    #[must_use]
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Get the run log, if any
    pub fn run_log(&self) -> Option<&RunLog> {
        self.run_log.as_ref()
    }

    // ========================================================================
    // Runs
    // ========================================================================

    /// Download the whole result set
    pub async fn run(&self, mode: RunMode) -> Result<RunSummary> {
        self.execute(mode, None).await
    }

    /// Download only what changed since the last logged run.
    ///
    /// Skips the download entirely when the dataset has not been refreshed
    /// since then. Without a previous run everything is fetched.
    pub async fn run_update(&self, mode: RunMode) -> Result<UpdateOutcome> {
        let log = self
            .run_log
            .as_ref()
            .ok_or_else(|| Error::config("update runs need a log_path"))?;

        let last_run = log.last_run().await;
        if let Some(since) = last_run {
            if !self.dataset_has_refreshed(since).await? {
                info!(
                    "{} has not been refreshed since {since}, nothing to do",
                    self.config.dataset_name
                );
                return Ok(UpdateOutcome::UpToDate { last_run: since });
            }
            info!("{} has been refreshed since {since}", self.config.dataset_name);
        } else {
            info!("No previous run logged, fetching everything");
        }

        let summary = self.execute(mode, last_run).await?;
        Ok(UpdateOutcome::Updated(summary))
    }

    /// Whether the dataset catalog reports a refresh after `since`
    pub async fn dataset_has_refreshed(&self, since: Timestamp) -> Result<bool> {
        let url = self.config.datasets_url()?;
        let request = RequestConfig::new()
            .query("$select", "lastDataSetRefresh")
            .query(
                "$filter",
                format!(
                    "name eq '{}' and version eq {}",
                    self.config.dataset_name.trim(),
                    self.config.dataset_version
                ),
            )
            .query("$metadata", "off");

        let body: JsonValue = self.client.get_json(url.as_str(), request).await?;
        let raw = body
            .get("DataSets")
            .and_then(|sets| sets.get(0))
            .and_then(|set| set.get("lastDataSetRefresh"))
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                Error::decode(format!(
                    "dataset catalog has no lastDataSetRefresh for {} v{}",
                    self.config.dataset_name, self.config.dataset_version
                ))
            })?;

        let refreshed = parse_refresh_date(raw)
            .ok_or_else(|| Error::decode(format!("unrecognized lastDataSetRefresh: {raw}")))?;
        debug!("{} last refreshed at {refreshed}", self.config.dataset_name);
        Ok(refreshed > since)
    }

    /// Write the geometries of every record as a GeoJSON `FeatureCollection`
    pub async fn export_geojson(&self) -> Result<RunSummary> {
        let clock = Instant::now();
        let mut config = self.config.clone();
        config.output_format = OutputFormat::Json;
        let query = QuerySpec::from_config(&config)?;
        let path = self
            .config
            .output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GEOJSON_PATH));

        let (url, params) = query.all_records_request();
        let body: JsonValue = self
            .client
            .get_json(url.as_str(), RequestConfig::with_query(params))
            .await?;
        let collection =
            feature_collection(&body, query.dataset_name(), &self.config.geometry_field)?;
        let features = collection["features"].as_array().map_or(0, Vec::len) as u64;

        let mut sink = FileSink::create(&path).await?;
        let encoded = serde_json::to_vec(&collection).context("encoding feature collection")?;
        sink.write(&encoded).await?;

        let mut summary =
            RunSummary::new(RunMode::Streamed, OutputFormat::Json, path.clone(), None);
        summary.bytes_written = sink.finish().await?;
        summary.expected_total = Some(features);
        info!("Wrote {features} features to {}", path.display());

        if self.config.verify {
            summary.verification = self
                .verify_with(&path, ArtifactLayout::geojson(), summary.expected_total)
                .await;
        }
        summary.duration_ms = clock.elapsed().as_millis() as u64;
        Ok(summary)
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Verify the configured output file as the configured format.
    ///
    /// `collection` names the JSON member holding the records, overriding the
    /// layout the format implies.
    pub async fn verify(&self, collection: Option<&str>) -> Verification {
        let layout = match collection {
            Some(key) => ArtifactLayout::JsonCollection(key.to_string()),
            None => ArtifactLayout::for_format(
                self.config.output_format,
                self.config.dataset_name.trim(),
            ),
        };
        self.verify_with(&self.config.resolved_output_path(), layout, None)
            .await
    }

    /// Count the records in `path`, comparing with `expected` when given.
    ///
    /// Failures are reported in the result rather than returned.
    pub async fn verify_with(
        &self,
        path: &Path,
        layout: ArtifactLayout,
        expected: Option<u64>,
    ) -> Verification {
        let path = path.to_path_buf();
        let counted = tokio::task::spawn_blocking(move || verify_artifact(&path, &layout)).await;

        let report = match counted {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                warn!("Verification failed: {e}");
                return Verification::Unreadable {
                    message: e.to_string(),
                };
            }
            Err(e) => {
                warn!("Verification task failed: {e}");
                return Verification::Unreadable {
                    message: e.to_string(),
                };
            }
        };

        match expected {
            Some(expected) if !report.matches(expected) => warn!(
                "{} holds {} records, upstream reported {expected}",
                report.path.display(),
                report.records
            ),
            _ => info!("Verified {} records in {}", report.records, report.path.display()),
        }
        Verification::Counted(report)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn execute(&self, mode: RunMode, since: Option<Timestamp>) -> Result<RunSummary> {
        let started = Utc::now();
        let clock = Instant::now();

        let query = QuerySpec::from_config(&self.config)?.with_changed_since(since);
        let path = self.config.resolved_output_path();
        let mut summary = RunSummary::new(mode, query.format(), path.clone(), since);

        info!(
            "Starting {mode:?} download of {} as {} into {}",
            query.dataset_name(),
            query.format(),
            path.display()
        );

        match mode {
            RunMode::Paged => self.fetch_paged(&query, &path, &mut summary).await?,
            RunMode::Streamed => self.fetch_streamed(&query, &path, &mut summary).await?,
        }

        if let Some(log) = &self.run_log {
            log.append(started).await?;
        }

        if self.config.verify {
            let layout = ArtifactLayout::for_format(query.format(), query.dataset_name());
            summary.verification = self
                .verify_with(&path, layout, summary.expected_total)
                .await;
        }

        summary.duration_ms = clock.elapsed().as_millis() as u64;
        info!(
            "Finished in {}ms: {} pages, {} bytes",
            summary.duration_ms, summary.pages_fetched, summary.bytes_written
        );
        Ok(summary)
    }

    async fn fetch_paged(
        &self,
        query: &QuerySpec,
        path: &Path,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let layout = PageLayout::for_format(query.format(), query.dataset_name())?;

        let mut fetcher = PagedFetcher::new(&self.client, query)?;
        let total = fetcher.probe_total().await?;
        summary.expected_total = Some(total);
        info!(
            "{total} records in {} pages of {}",
            fetcher.cursor().expected_pages().unwrap_or_default(),
            query.page_size()
        );

        let sink = FileSink::create(path).await?;
        let mut writer = PageWriter::new(sink, layout);

        let mut pages = std::pin::pin!(fetcher.into_stream());
        while let Some(page) = pages.try_next().await? {
            writer.write_page(&page.body).await?;
            summary.pages_fetched = writer.pages_written();
            summary.bytes_written = writer.bytes_written();
        }

        summary.bytes_written = writer.finish().await?;
        Ok(())
    }

    async fn fetch_streamed(
        &self,
        query: &QuerySpec,
        path: &Path,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if self.config.verify {
            summary.expected_total = Some(probe_total(&self.client, query).await?);
        }

        let (url, params) = query.all_records_request();
        let mut response = self
            .client
            .get_with_config(url.as_str(), RequestConfig::with_query(params))
            .await?;
        check_content_type(&response, query.format())?;

        // Flushed per chunk so an interrupted download keeps what arrived.
        let mut sink = FileSink::create(path).await?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transport_error("download interrupted", &e))?
        {
            sink.write(&chunk).await?;
            sink.flush().await?;
            summary.bytes_written = sink.bytes_written();
        }

        summary.bytes_written = sink.finish().await?;
        Ok(())
    }
}

/// Catalog dates come with or without an offset; offset-less dates are UTC
fn parse_refresh_date(raw: &str) -> Option<Timestamp> {
    parse_timestamp(raw).or_else(|| {
        NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    })
}
