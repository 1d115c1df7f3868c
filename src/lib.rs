// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # opendata-fetch
//!
//! Downloads complete result sets from open-data REST APIs (OData-style
//! `$skip`/`$top`/`$filter` query parameters) into local files, then checks
//! that the file holds as many records as the API reported.
//!
//! ## Features
//!
//! - **Paged downloads**: sequential `$skip`/`$top` requests driven by the
//!   `$inlinecount` total
//! - **Streamed downloads**: one `$allrecords=true` response written chunk by
//!   chunk
//! - **Formats**: JSON, JSON array, JSON Lines, CSV, Parquet
//! - **Incremental updates**: an append-only run log plus the dataset
//!   catalog's refresh date
//! - **Verification**: record counts recomputed from the written file
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use opendata_fetch::{FetchConfig, FetchEngine, OutputFormat, RunMode};
//!
//! #[tokio::main]
//! async fn main() -> opendata_fetch::Result<()> {
//!     let config = FetchConfig {
//!         output_format: OutputFormat::Csv,
//!         output_path: Some("declarations.csv".into()),
//!         ..Default::default()
//!     };
//!
//!     let summary = FetchEngine::new(config)?.run(RunMode::Paged).await?;
//!     println!("{} records", summary.verified_records().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        FetchEngine                        │
//! │   run(mode)   run_update(mode)   export_geojson()         │
//! └───────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────┬───────────┬──────┴──────┬───────────┬──────────┐
//! │  Query   │   HTTP    │  Paginate   │  Output   │  Verify  │
//! ├──────────┼───────────┼─────────────┼───────────┼──────────┤
//! │ $select  │ GET       │ Probe count │ FileSink  │ Lines    │
//! │ $filter  │ Pacing    │ $skip/$top  │ CSV merge │ CSV      │
//! │ $orderby │ Status    │ Stream      │ JSON wrap │ JSON     │
//! │ since    │ Mime type │             │ GeoJSON   │ Parquet  │
//! └──────────┴───────────┴─────────────┴───────────┴──────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Run configuration
pub mod config;

/// OData query parameters
pub mod query;

/// HTTP client with rate limiting
pub mod http;

/// Offset pagination driven by the metadata count
pub mod pagination;

/// Byte sinks and page joining
pub mod output;

/// Record counting over finished artifacts
pub mod verify;

/// Run log
pub mod state;

/// Main execution engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::FetchConfig;
pub use engine::{FetchEngine, RunSummary, UpdateOutcome, Verification};
pub use query::QuerySpec;
pub use state::RunLog;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
