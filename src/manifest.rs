//! Manifest describing the files published by a run.

use std::path::Path;

use crate::output::sha256_file;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Latest alias files of a dataset, relative to the output root.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LatestFiles {
    pub cross_section: String,
    pub timeseries_hyphen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeseries_underscore: Option<String>,
}

/// Content hashes of the files written for a dataset.
///
/// Either all four hashes are present or none are.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FileHashes {
    pub snapshot: Option<String>,
    pub timeseries: Option<String>,
    pub latest_cross: Option<String>,
    pub latest_timeseries: Option<String>,
}

impl FileHashes {
    /// Hash the four published files of a dataset.
    ///
    /// Hashing is best effort: if any file cannot be hashed a warning is logged and every hash
    /// is left empty.
    pub fn compute(
        snapshot: &Path,
        timeseries: &Path,
        latest_cross: &Path,
        latest_timeseries: &Path,
    ) -> Self {
        let hashes = (|| -> std::io::Result<Self> {
            Ok(Self {
                snapshot: Some(sha256_file(snapshot)?),
                timeseries: Some(sha256_file(timeseries)?),
                latest_cross: Some(sha256_file(latest_cross)?),
                latest_timeseries: Some(sha256_file(latest_timeseries)?),
            })
        })();
        hashes.unwrap_or_else(|error| {
            tracing::warn!("failed to hash output files: {}", error);
            Self::default()
        })
    }
}

/// Manifest entry of a successfully processed dataset.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ManifestEntry {
    /// RFC 3339 generation timestamp in UTC
    pub updated_at: String,
    /// Label of the most recent period
    pub latest_period: String,
    /// Unit label
    pub unit: String,
    /// Dated latest-period snapshot, relative to the output root
    pub latest_snapshot: String,
    /// Dated timeseries snapshot, relative to the output root
    pub latest_timeseries: String,
    pub latest_files: LatestFiles,
    pub hashes: FileHashes,
    /// URL the cube was fetched from
    pub source_url: String,
    /// Number of latest-period records
    pub record_count_latest: usize,
    /// Number of points over all series
    pub record_count_timeseries: usize,
}

/// Manifest document, keyed by dataset id in processing order.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Manifest {
    pub datasets: IndexMap<String, ManifestEntry>,
}

impl Manifest {
    /// Record the entry of a dataset.
    pub fn insert(&mut self, id: &str, entry: ManifestEntry) {
        self.datasets.insert(id.to_string(), entry);
    }
}
