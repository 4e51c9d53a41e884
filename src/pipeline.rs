//! Orchestration of a run over the configured datasets.

use std::path::PathBuf;

use crate::config::{DatasetConfig, EtlConfig};
use crate::error::{log_dataset_error, EtlError};
use crate::fetch::CubeFetcher;
use crate::manifest::{FileHashes, LatestFiles, Manifest, ManifestEntry};
use crate::output::{self, OutputLayout};
use crate::projection;

use time::OffsetDateTime;

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// The manifest that was written
    pub manifest: Manifest,
    /// Ids of the datasets that failed, in processing order
    pub failed: Vec<String>,
}

/// Runs the ETL for every configured dataset.
#[derive(Debug)]
pub struct Pipeline<F> {
    config: EtlConfig,
    output_dir: PathBuf,
    fetcher: F,
}

impl<F: CubeFetcher> Pipeline<F> {
    /// Create a pipeline.
    ///
    /// # Arguments
    ///
    /// * `config`: Run configuration
    /// * `output_dir`: Output root directory
    /// * `fetcher`: Source of cube documents
    pub fn new(config: EtlConfig, output_dir: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            fetcher,
        }
    }

    /// Process every dataset and write the manifest.
    pub async fn run(&self) -> Result<RunSummary, EtlError> {
        self.run_at(OffsetDateTime::now_utc()).await
    }

    /// Process every dataset as of `now` and write the manifest.
    ///
    /// Datasets are processed in configuration order. A failing dataset is logged and left out
    /// of the manifest, and the run moves on. Only a failure to write the manifest fails the
    /// run.
    pub async fn run_at(&self, now: OffsetDateTime) -> Result<RunSummary, EtlError> {
        let layout = OutputLayout::new(&self.output_dir, now)?;
        let updated_at = output::format_timestamp(now)?;
        let mut manifest = Manifest::default();
        let mut failed = Vec::new();
        for dataset in &self.config.datasets {
            match self.process_dataset(dataset, &layout, &updated_at).await {
                Ok(entry) => manifest.insert(&dataset.id, entry),
                Err(error) => {
                    log_dataset_error(&dataset.id, &error);
                    failed.push(dataset.id.clone());
                }
            }
        }
        let manifest_path = layout.manifest();
        output::write_json(&manifest_path, &manifest)?;
        tracing::info!(
            datasets = manifest.datasets.len(),
            failed = failed.len(),
            "Manifest written to {}",
            manifest_path.display()
        );
        Ok(RunSummary { manifest, failed })
    }

    /// Fetch, reduce and publish a single dataset.
    ///
    /// Returns the dataset's manifest entry.
    ///
    /// # Arguments
    ///
    /// * `dataset`: Dataset configuration
    /// * `layout`: Output layout of the run
    /// * `updated_at`: Timestamp of the run
    #[tracing::instrument(skip_all, fields(dataset = %dataset.id))]
    pub async fn process_dataset(
        &self,
        dataset: &DatasetConfig,
        layout: &OutputLayout,
        updated_at: &str,
    ) -> Result<ManifestEntry, EtlError> {
        let id = dataset.id.as_str();
        let source_url = dataset.source_url(&self.config.base_url)?;
        tracing::info!(
            "Processing dataset {} (lastTimePeriod={})",
            id,
            dataset.last_time_periods
        );

        tracing::info!("Fetching cube: {}", source_url);
        let cube = self.fetcher.fetch(&source_url).await?;
        let reduction = projection::reduce(&cube, &dataset.unit_label)?;
        tracing::info!(
            latest_countries = reduction.latest.len(),
            unit_chosen = ?reduction.meta.chosen_unit,
            latest = %reduction.meta.latest_time_label,
            "Parsed cube"
        );
        if reduction.latest.is_empty() {
            return Err(EtlError::EmptyResult {
                dataset: id.to_string(),
            });
        }

        let record_count_timeseries = reduction.timeseries_point_count();
        let latest = output::build_latest_envelope(
            dataset,
            &source_url,
            updated_at,
            &reduction.meta,
            reduction.latest,
        );
        let timeseries = output::build_timeseries_envelope(
            dataset,
            &source_url,
            updated_at,
            &reduction.meta,
            reduction.timeseries,
        );

        let snapshot_path = layout.snapshot(id);
        let timeseries_path = layout.timeseries(id);
        let latest_cross_path = layout.latest_cross(id);
        let latest_hyphen_path = layout.latest_timeseries_hyphen(id);

        output::write_json(&snapshot_path, &latest)?;
        output::write_json(&timeseries_path, &timeseries)?;
        output::write_json(&latest_cross_path, &latest)?;
        output::write_json(&latest_hyphen_path, &timeseries)?;
        let latest_underscore_path = if dataset.underscore_alias {
            let path = layout.latest_timeseries_underscore(id);
            output::write_json(&path, &timeseries)?;
            Some(path)
        } else {
            None
        };

        let hashes = FileHashes::compute(
            &snapshot_path,
            &timeseries_path,
            &latest_cross_path,
            &latest_hyphen_path,
        );

        Ok(ManifestEntry {
            updated_at: updated_at.to_string(),
            latest_period: latest.latest_period.clone(),
            unit: latest.unit.clone(),
            latest_snapshot: layout.relative(&snapshot_path),
            latest_timeseries: layout.relative(&timeseries_path),
            latest_files: LatestFiles {
                cross_section: layout.relative(&latest_cross_path),
                timeseries_hyphen: layout.relative(&latest_hyphen_path),
                timeseries_underscore: latest_underscore_path.map(|path| layout.relative(&path)),
            },
            hashes,
            source_url: source_url.to_string(),
            record_count_latest: latest.records.len(),
            record_count_timeseries,
        })
    }
}
