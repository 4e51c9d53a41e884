//! Error handling.

use std::error::Error;
use std::num::ParseIntError;
use std::path::PathBuf;

use strum_macros::Display;
use thiserror::Error;
use tracing::{event, Level};

/// ETL error type
///
/// This type encapsulates the various errors that may occur while processing a dataset.
/// Each variant belongs to one [ErrorKind], which determines how it is reported.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Error sending the request or reading the response body
    #[error("error fetching cube from {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Error building the HTTP client
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("HTTP request to {url} failed with status: {status}")]
    HttpStatus { url: String, status: u16 },

    /// The response body is not a cube document
    #[error("response from {url} is not a valid cube document")]
    CubeParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Error validating a cube document
    #[error("cube document is not valid")]
    CubeValidation(#[from] validator::ValidationErrors),

    /// A dimension named in `id` has no metadata
    #[error("dimension {dimension} missing from cube metadata")]
    MissingDimension { dimension: String },

    /// The cube has no `time` dimension
    #[error("no time dimension found in cube")]
    MissingTimeDimension,

    /// The cube has no observations
    #[error("cube contains no values")]
    EmptyValues,

    /// A value key is not a base-10 integer
    #[error("invalid linear index {index}")]
    InvalidIndex {
        index: String,
        #[source]
        source: ParseIntError,
    },

    /// A value key lies outside the addressable cell space
    #[error("linear index {index} outside cell space of {cells} cells")]
    IndexOutOfRange { index: usize, cells: usize },

    /// The declared sizes address more cells than an index can hold
    #[error("dimension sizes {sizes:?} overflow the cell index range")]
    CellSpaceOverflow { sizes: Vec<usize> },

    /// A decoded position has no category code
    #[error("no category at position {position} of dimension {dimension}")]
    UnknownPosition { dimension: String, position: usize },

    /// Unit and time filtering left nothing to publish
    #[error("no latest-period records for dataset {dataset} after filtering")]
    EmptyResult { dataset: String },

    /// Error writing an output document
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Other I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error serialising an output document
    #[error("failed to serialise JSON")]
    Json(#[from] serde_json::Error),

    /// Error formatting a timestamp
    #[error("failed to format timestamp")]
    Timestamp(#[from] time::error::Format),

    /// Error reading the configuration file
    #[error("failed to read configuration file {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing the configuration file
    #[error("failed to parse configuration file {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Error validating the configuration
    #[error("configuration is not valid")]
    ConfigValidation(#[source] validator::ValidationErrors),

    /// A dataset filter names no configured dataset
    #[error("unknown dataset {dataset}")]
    UnknownDataset { dataset: String },

    /// A source URL could not be built
    #[error("invalid source URL")]
    InvalidUrl(#[from] url::ParseError),
}

/// Classification of [EtlError] variants.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Fetch failed, returned a non-success status or an undecodable body
    Network,
    /// Cube is missing required structure
    Structural,
    /// Filtering produced no latest-period records
    EmptyResult,
    /// Writing or serialising output failed
    Io,
    /// Configuration could not be loaded
    Config,
}

impl EtlError {
    /// Returns the [ErrorKind] of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            // Network
            EtlError::Fetch { .. } | EtlError::HttpStatus { .. } | EtlError::CubeParse { .. } => {
                ErrorKind::Network
            }

            // Structural
            EtlError::CubeValidation(_)
            | EtlError::MissingDimension { .. }
            | EtlError::MissingTimeDimension
            | EtlError::EmptyValues
            | EtlError::InvalidIndex { .. }
            | EtlError::IndexOutOfRange { .. }
            | EtlError::CellSpaceOverflow { .. }
            | EtlError::UnknownPosition { .. } => ErrorKind::Structural,

            // Empty result
            EtlError::EmptyResult { .. } => ErrorKind::EmptyResult,

            // I/O
            EtlError::Write { .. }
            | EtlError::Io(_)
            | EtlError::Json(_)
            | EtlError::Timestamp(_) => ErrorKind::Io,

            // Configuration
            EtlError::ConfigRead { .. }
            | EtlError::ConfigParse { .. }
            | EtlError::ConfigValidation(_)
            | EtlError::UnknownDataset { .. }
            | EtlError::HttpClient(_)
            | EtlError::InvalidUrl(_) => ErrorKind::Config,
        }
    }
}

/// Returns the messages of the chain of errors that caused `error`.
///
/// Adjacent duplicate messages are removed.
pub fn caused_by<E>(error: &E) -> Vec<String>
where
    E: std::error::Error,
{
    let mut causes = Vec::new();
    let mut current = error.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes.dedup();
    causes
}

/// Log a run-level failure along with its causes.
pub fn log_error(error: &EtlError) {
    event!(Level::ERROR, kind = %error.kind(), "{}", error);
    for cause in caused_by(error) {
        event!(Level::ERROR, "Caused by: {}", cause);
    }
}

/// Log a dataset failure along with its causes.
///
/// # Arguments
///
/// * `dataset`: Identifier of the dataset that failed
/// * `error`: The error that occurred
pub fn log_dataset_error(dataset: &str, error: &EtlError) {
    event!(
        Level::ERROR,
        dataset,
        kind = %error.kind(),
        "dataset {} failed: {}",
        dataset,
        error
    );
    for cause in caused_by(error) {
        event!(Level::ERROR, dataset, "Caused by: {}", cause);
    }
}
