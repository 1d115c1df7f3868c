//! CLI commands and argument parsing

use crate::types::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Download open-data API datasets into local files
#[derive(Parser, Debug)]
#[command(name = "opendata-fetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML, or JSON by extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API root, e.g. https://www.fema.gov/api/open
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Dataset name
    #[arg(long, global = true)]
    pub dataset: Option<String>,

    /// Dataset version
    #[arg(long, global = true)]
    pub dataset_version: Option<u32>,

    /// Fields to select (comma-separated)
    #[arg(long, global = true, value_delimiter = ',')]
    pub select: Option<Vec<String>>,

    /// OData filter expression
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// OData order-by clause
    #[arg(long, global = true)]
    pub order_by: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Output file
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Run log file
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    /// Records per page request
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Download page by page ($skip/$top)
    Page,

    /// Download everything in one streamed response ($allrecords)
    Stream,

    /// Download only records changed since the last logged run
    Update {
        /// Page through the changes instead of streaming them
        #[arg(long)]
        paged: bool,
    },

    /// Export record geometries as a GeoJSON FeatureCollection
    Geojson {
        /// Record field holding the geometry
        #[arg(long)]
        geometry_field: Option<String>,
    },

    /// Count the records in an existing artifact, read as `--format`
    Verify {
        /// Artifact to read (defaults to the configured output)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Key of the record array in a JSON collection (defaults to the
        /// dataset name)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Print the last run log entry
    LastRun,
}
