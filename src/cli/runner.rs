//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::FetchConfig;
use crate::engine::{FetchEngine, Verification};
use crate::error::{Error, Result};
use crate::state::RunLog;
use crate::types::RunMode;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let mut config = self.config()?;

        match &self.cli.command {
            Commands::Page => {
                let summary = FetchEngine::new(config)?.run(RunMode::Paged).await?;
                print_json(&summary)
            }
            Commands::Stream => {
                let summary = FetchEngine::new(config)?.run(RunMode::Streamed).await?;
                print_json(&summary)
            }
            Commands::Update { paged } => {
                let mode = if *paged {
                    RunMode::Paged
                } else {
                    RunMode::Streamed
                };
                let outcome = FetchEngine::new(config)?.run_update(mode).await?;
                print_json(&outcome)
            }
            Commands::Geojson { geometry_field } => {
                if let Some(field) = geometry_field {
                    config.geometry_field.clone_from(field);
                }
                let summary = FetchEngine::new(config)?.export_geojson().await?;
                print_json(&summary)
            }
            Commands::Verify { path, collection } => {
                if path.is_some() {
                    config.output_path.clone_from(path);
                }
                let engine = FetchEngine::new(config)?;
                let verification = engine.verify(collection.as_deref()).await;
                print_json(&verification)?;
                match verification {
                    Verification::Unreadable { message } => Err(Error::malformed(
                        engine.config().resolved_output_path().display().to_string(),
                        message,
                    )),
                    _ => Ok(()),
                }
            }
            Commands::LastRun => {
                let path = config
                    .log_path
                    .ok_or_else(|| Error::config("no run log configured (use --log)"))?;
                let last_run = RunLog::new(&path).try_last_run().await?;
                print_json(&json!({
                    "log_path": path,
                    "last_run": last_run,
                }))
            }
        }
    }

    /// Configuration file (or defaults) with command-line overrides applied
    pub fn config(&self) -> Result<FetchConfig> {
        let mut config = match &self.cli.config {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                FetchConfig::from_file(path)?
            }
            None => FetchConfig::default(),
        };

        let cli = &self.cli;
        if let Some(endpoint) = &cli.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(dataset) = &cli.dataset {
            config.dataset_name.clone_from(dataset);
        }
        if let Some(version) = cli.dataset_version {
            config.dataset_version = version;
        }
        if let Some(select) = &cli.select {
            config.select_fields.clone_from(select);
        }
        if cli.filter.is_some() {
            config.filter_expr.clone_from(&cli.filter);
        }
        if cli.order_by.is_some() {
            config.order_by.clone_from(&cli.order_by);
        }
        if let Some(format) = cli.format {
            config.output_format = format;
        }
        if cli.output.is_some() {
            config.output_path.clone_from(&cli.output);
        }
        if cli.log.is_some() {
            config.log_path.clone_from(&cli.log);
        }
        if let Some(page_size) = cli.page_size {
            config.page_size = page_size;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Print a value to stdout as pretty JSON
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputFormat;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn runner(args: &[&str]) -> Runner {
        let mut argv = vec!["opendata-fetch"];
        argv.extend_from_slice(args);
        Runner::new(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = runner(&["page"]).config().unwrap();
        assert_eq!(config, FetchConfig::default());
    }

    #[test]
    fn test_overrides_applied() {
        let config = runner(&[
            "--dataset",
            "FemaRegions",
            "--dataset-version",
            "1",
            "--select",
            "id,name",
            "--filter",
            "state eq 'VA'",
            "-f",
            "csv",
            "-o",
            "regions.csv",
            "--page-size",
            "500",
            "page",
        ])
        .config()
        .unwrap();

        assert_eq!(config.dataset_name, "FemaRegions");
        assert_eq!(config.dataset_version, 1);
        assert_eq!(config.select_fields, vec!["id", "name"]);
        assert_eq!(config.filter_expr.as_deref(), Some("state eq 'VA'"));
        assert_eq!(config.output_format, OutputFormat::Csv);
        assert_eq!(config.output_path, Some(PathBuf::from("regions.csv")));
        assert_eq!(config.page_size, 500);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "dataset_name: FromFile\npage_size: 100\n").unwrap();

        let config = runner(&["-c", path.to_str().unwrap(), "--page-size", "7", "stream"])
            .config()
            .unwrap();

        assert_eq!(config.dataset_name, "FromFile");
        assert_eq!(config.page_size, 7);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let err = runner(&["--page-size", "0", "page"]).config().unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["opendata-fetch", "update", "--paged"]).unwrap();
        assert_eq!(cli.command, Commands::Update { paged: true });

        let cli = Cli::try_parse_from([
            "opendata-fetch",
            "verify",
            "--path",
            "x.json",
            "--collection",
            "features",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Commands::Verify {
                path: Some(PathBuf::from("x.json")),
                collection: Some("features".to_string()),
            }
        );

        let cli = Cli::try_parse_from(["opendata-fetch", "last-run", "--log", "log.txt"]).unwrap();
        assert_eq!(cli.command, Commands::LastRun);
        assert_eq!(cli.log, Some(PathBuf::from("log.txt")));
    }

    #[tokio::test]
    async fn test_verify_counts_collection_at_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions.json");
        std::fs::write(&path, r#"{"Regions":[{"id":1},{"id":2}]}"#).unwrap();

        let args = ["verify", "--path", path.to_str().unwrap(), "--collection", "Regions"];
        runner(&args).run().await.unwrap();

        let err = runner(&["verify", "--path", path.to_str().unwrap(), "--collection", "Other"])
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedArtifact { .. }));
    }

    #[tokio::test]
    async fn test_last_run_requires_log() {
        let err = runner(&["last-run"]).run().await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
