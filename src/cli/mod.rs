//! CLI module
//!
//! Command-line interface for downloading datasets.
//!
//! # Commands
//!
//! - `page` - Paged download
//! - `stream` - Streamed all-records download
//! - `update` - Incremental download driven by the run log
//! - `geojson` - GeoJSON export of record geometries
//! - `verify` - Count the records of an existing artifact
//! - `last-run` - Show the last run log entry

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
