//! Command Line Interface (CLI) arguments.

use std::path::PathBuf;

use crate::error::EtlError;

use clap::Parser;
use expanduser::expanduser;
use url::Url;

/// Eurostat fiscal facts ETL command line interface
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct CommandLineArgs {
    /// Root directory of the published snapshots
    #[arg(long, default_value = "data", env = "EUFACTS_OUTPUT_DIR")]
    pub output_dir: String,
    /// Path to a JSON configuration file. The built-in datasets are used if not set.
    #[arg(long, env = "EUFACTS_CONFIG")]
    pub config: Option<String>,
    /// Base URL of the statistics API, overriding the configuration
    #[arg(long, env = "EUFACTS_BASE_URL")]
    pub base_url: Option<Url>,
    /// Fetch timeout in seconds, overriding the configuration
    #[arg(long, env = "EUFACTS_TIMEOUT")]
    pub timeout: Option<u64>,
    /// Process only this dataset. May be repeated.
    #[arg(long, env = "EUFACTS_DATASET", value_delimiter = ',')]
    pub dataset: Vec<String>,
    /// Whether to emit logs as JSON lines.
    #[arg(long, default_value_t = false, env = "EUFACTS_JSON_LOGS")]
    pub json_logs: bool,
}

impl CommandLineArgs {
    /// Returns the output directory with `~` expanded.
    pub fn output_path(&self) -> Result<PathBuf, EtlError> {
        Ok(expanduser(&self.output_dir)?)
    }

    /// Returns the configuration file path with `~` expanded, if one was given.
    pub fn config_path(&self) -> Result<Option<PathBuf>, EtlError> {
        self.config
            .as_ref()
            .map(|config| {
                expanduser(config).map_err(|source| EtlError::ConfigRead {
                    path: PathBuf::from(config),
                    source,
                })
            })
            .transpose()
    }
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
