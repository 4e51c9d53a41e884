//! Output documents and their on-disk layout.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::DatasetConfig;
use crate::error::EtlError;
use crate::models::{CountrySeries, DatasetEnvelope, LatestEnvelope, LatestRecord, TimeseriesEnvelope};
use crate::projection::ReductionMeta;

use serde::Serialize;
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use url::Url;

/// Size of the read buffer used when hashing files
const HASH_CHUNK_SIZE: usize = 8192;

/// Directory of dated latest-period snapshots
pub const SNAPSHOTS_DIR: &str = "snapshots";
/// Directory of dated timeseries snapshots
pub const TIMESERIES_DIR: &str = "timeseries";
/// Directory of latest aliases and the manifest
pub const LATEST_DIR: &str = "latest";

/// Paths of the files written during a run.
///
/// Snapshots are grouped by the UTC date of the run.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputLayout {
    root: PathBuf,
    date: String,
}

impl OutputLayout {
    /// Create the layout of a run.
    ///
    /// # Arguments
    ///
    /// * `root`: Output root directory
    /// * `now`: Start time of the run
    pub fn new(root: impl Into<PathBuf>, now: OffsetDateTime) -> Result<Self, EtlError> {
        let date = now
            .to_offset(UtcOffset::UTC)
            .format(format_description!("[year]-[month]-[day]"))?;
        Ok(Self {
            root: root.into(),
            date,
        })
    }

    /// Returns the output root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the run date, `YYYY-MM-DD`.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn snapshot(&self, id: &str) -> PathBuf {
        self.root
            .join(SNAPSHOTS_DIR)
            .join(&self.date)
            .join(format!("{}.json", id))
    }

    pub fn timeseries(&self, id: &str) -> PathBuf {
        self.root
            .join(TIMESERIES_DIR)
            .join(&self.date)
            .join(format!("{}.json", id))
    }

    pub fn latest_cross(&self, id: &str) -> PathBuf {
        self.root.join(LATEST_DIR).join(format!("{}.json", id))
    }

    pub fn latest_timeseries_hyphen(&self, id: &str) -> PathBuf {
        self.root
            .join(LATEST_DIR)
            .join(format!("{}-timeseries.json", id))
    }

    pub fn latest_timeseries_underscore(&self, id: &str) -> PathBuf {
        self.root
            .join(LATEST_DIR)
            .join(format!("{}_timeseries.json", id))
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(LATEST_DIR).join("manifest.json")
    }

    /// Returns `path` relative to the root, with `/` separators.
    ///
    /// Paths outside the root are returned unchanged.
    pub fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Format a timestamp as RFC 3339 in UTC.
pub fn format_timestamp(now: OffsetDateTime) -> Result<String, EtlError> {
    Ok(now.to_offset(UtcOffset::UTC).format(&Rfc3339)?)
}

/// Write `value` as pretty-printed JSON, creating parent directories as needed.
///
/// Returns the number of bytes written.
///
/// # Arguments
///
/// * `path`: Destination file
/// * `value`: Document to write
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<usize, EtlError> {
    let write_error = |source| EtlError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, &json).map_err(write_error)?;
    tracing::info!("Wrote {} ({} bytes)", path.display(), json.len());
    Ok(json.len())
}

/// Returns the SHA-256 digest of a file as `sha256:<hex>`.
pub fn sha256_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

fn build_envelope<R>(
    dataset: &DatasetConfig,
    description: String,
    source_url: &Url,
    updated_at: &str,
    meta: &ReductionMeta,
    records: Vec<R>,
    notes: &[String],
) -> DatasetEnvelope<R> {
    DatasetEnvelope {
        dataset: dataset.id.to_uppercase(),
        description,
        source_url: source_url.to_string(),
        updated_at: updated_at.to_string(),
        latest_period: meta.latest_time_label.clone(),
        unit: dataset.unit_label.clone(),
        records,
        notes: notes.to_vec(),
    }
}

/// Wrap the latest-period projection of a dataset.
pub fn build_latest_envelope(
    dataset: &DatasetConfig,
    source_url: &Url,
    updated_at: &str,
    meta: &ReductionMeta,
    records: Vec<LatestRecord>,
) -> LatestEnvelope {
    build_envelope(
        dataset,
        format!("{} (latest period)", dataset.description),
        source_url,
        updated_at,
        meta,
        records,
        &dataset.notes_latest,
    )
}

/// Wrap the timeseries projection of a dataset.
pub fn build_timeseries_envelope(
    dataset: &DatasetConfig,
    source_url: &Url,
    updated_at: &str,
    meta: &ReductionMeta,
    records: Vec<CountrySeries>,
) -> TimeseriesEnvelope {
    build_envelope(
        dataset,
        format!(
            "{} (last {} periods)",
            dataset.description, dataset.last_time_periods
        ),
        source_url,
        updated_at,
        meta,
        records,
        &dataset.notes_timeseries,
    )
}
