//! This file defines the eufacts binary entry point.

use std::process::ExitCode;
use std::time::Duration;

use eufacts::cli;
use eufacts::config::EtlConfig;
use eufacts::error::{log_error, EtlError};
use eufacts::fetch::HttpCubeFetcher;
use eufacts::pipeline::{Pipeline, RunSummary};
use eufacts::tracing;

/// Load the configuration and run the pipeline.
async fn run(args: &cli::CommandLineArgs) -> Result<RunSummary, EtlError> {
    let config = EtlConfig::load(args)?;
    let output_dir = args.output_path()?;
    let fetcher = HttpCubeFetcher::new(Duration::from_secs(config.timeout_secs))?;
    Pipeline::new(config, output_dir, fetcher).run().await
}

/// Application entry point
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = cli::parse();
    tracing::init_tracing(&args);
    match run(&args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            log_error(&error);
            ExitCode::FAILURE
        }
    }
}
