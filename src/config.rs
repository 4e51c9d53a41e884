//! Run configuration: the datasets to process and how to fetch them.

use std::path::Path;

use crate::cli::CommandLineArgs;
use crate::error::EtlError;

use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError};

/// Eurostat dissemination API base URL
pub const DEFAULT_BASE_URL: &str =
    "https://ec.europa.eu/eurostat/api/dissemination/statistics/1.0/data";

/// Fetch timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Unit label stamped on outputs
pub const DEFAULT_UNIT_LABEL: &str = "% of GDP";

fn default_base_url() -> Url {
    // The constant is a valid absolute URL.
    Url::parse(DEFAULT_BASE_URL).expect("default base URL should parse")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_unit_label() -> String {
    DEFAULT_UNIT_LABEL.to_string()
}

/// Configuration of a single dataset
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Dataset identifier, also used for output file names
    #[validate(
        length(min = 1, message = "dataset id must not be empty"),
        custom = "validate_dataset_id"
    )]
    pub id: String,
    /// Human readable description
    pub description: String,
    /// Number of most recent periods to request
    #[validate(range(min = 1, message = "last_time_periods must be greater than 0"))]
    pub last_time_periods: u32,
    /// Explicit source URL, overriding the one derived from the base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Unit label stamped on outputs
    #[serde(default = "default_unit_label")]
    pub unit_label: String,
    /// Notes attached to the latest-period envelope
    #[serde(default)]
    pub notes_latest: Vec<String>,
    /// Notes attached to the timeseries envelope
    #[serde(default)]
    pub notes_timeseries: Vec<String>,
    /// Also write the timeseries alias as `<id>_timeseries.json`
    #[serde(default)]
    pub underscore_alias: bool,
}

impl DatasetConfig {
    /// Returns the URL to fetch this dataset from.
    ///
    /// An explicit `url` wins. Otherwise the URL is `<base_url>/<id>?lastTimePeriod=<n>`.
    pub fn source_url(&self, base_url: &Url) -> Result<Url, EtlError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let mut url = Url::parse(&format!(
            "{}/{}",
            base_url.as_str().trim_end_matches('/'),
            self.id
        ))?;
        url.query_pairs_mut()
            .append_pair("lastTimePeriod", &self.last_time_periods.to_string());
        Ok(url)
    }
}

/// Validate that a dataset id is usable as a file name
fn validate_dataset_id(id: &str) -> Result<(), ValidationError> {
    if id.contains(['/', '\\']) || id.starts_with('.') {
        let mut error = ValidationError::new("dataset id must be a plain file name");
        error.add_param("id".into(), &id);
        return Err(error);
    }
    Ok(())
}

/// Configuration of a run
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_etl_config"))]
pub struct EtlConfig {
    /// Base URL of the statistics API
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    /// Fetch timeout in seconds
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, message = "timeout_secs must be greater than 0"))]
    pub timeout_secs: u64,
    /// Datasets to process, in order
    #[validate]
    #[validate(length(min = 1, message = "datasets must not be empty"))]
    pub datasets: Vec<DatasetConfig>,
}

/// Validate that dataset ids are unique
fn validate_etl_config(config: &EtlConfig) -> Result<(), ValidationError> {
    for (n, dataset) in config.datasets.iter().enumerate() {
        if config.datasets[..n].iter().any(|other| other.id == dataset.id) {
            let mut error = ValidationError::new("dataset ids must be unique");
            error.add_param("id".into(), &dataset.id);
            return Err(error);
        }
    }
    Ok(())
}

impl Default for EtlConfig {
    /// The government debt and tax revenue datasets.
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            datasets: vec![
                DatasetConfig {
                    id: "teina230".to_string(),
                    description: "General government gross debt, % of GDP (quarterly)"
                        .to_string(),
                    last_time_periods: 12,
                    url: None,
                    unit_label: default_unit_label(),
                    notes_latest: vec![
                        "Eurostat 1.0 API; 12 quarters retrieved and reduced to latest quarter in ETL.".to_string(),
                        "Values represent consolidated gross debt of general government.".to_string(),
                        "Figures may be revised by Eurostat; check source for metadata.".to_string(),
                    ],
                    notes_timeseries: vec![
                        "Eurostat 1.0 API; last 12 quarters as returned by API.".to_string(),
                        "Series sorted by time ascending per country.".to_string(),
                    ],
                    underscore_alias: false,
                },
                DatasetConfig {
                    id: "gov_10a_taxag".to_string(),
                    description: "Total receipts from taxes and social contributions (% of GDP, general government, annual)".to_string(),
                    last_time_periods: 5,
                    url: Url::parse(&format!(
                        "{}/gov_10a_taxag?freq=A&unit=PC_GDP&sector=S13&na_item=D2_D5_D91_D61_M_D612_M_D614_M_D995&lastTimePeriod=5",
                        DEFAULT_BASE_URL
                    ))
                    .ok(),
                    unit_label: default_unit_label(),
                    notes_latest: vec![
                        "Eurostat 1.0 API; last 5 years retrieved and reduced to latest year in ETL.".to_string(),
                        "Values represent general government revenue from taxes and social contributions.".to_string(),
                        "Figures may be revised by Eurostat; check source for metadata.".to_string(),
                    ],
                    notes_timeseries: vec![
                        "Eurostat 1.0 API; last 5 years as returned by API.".to_string(),
                        "Series sorted by time ascending per country.".to_string(),
                    ],
                    underscore_alias: false,
                },
            ],
        }
    }
}

impl EtlConfig {
    /// Read a configuration from a JSON file.
    ///
    /// The result is not validated.
    pub fn from_file(path: &Path) -> Result<Self, EtlError> {
        let contents = std::fs::read_to_string(path).map_err(|source| EtlError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| EtlError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Restrict the run to the named datasets, keeping configuration order.
    ///
    /// Fails if a name matches no configured dataset. An empty list keeps every dataset.
    pub fn select(&mut self, ids: &[String]) -> Result<(), EtlError> {
        if ids.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = ids
            .iter()
            .find(|id| !self.datasets.iter().any(|dataset| &dataset.id == *id))
        {
            return Err(EtlError::UnknownDataset {
                dataset: unknown.clone(),
            });
        }
        self.datasets.retain(|dataset| ids.contains(&dataset.id));
        Ok(())
    }

    /// Build the configuration for a run from the command line.
    ///
    /// Starts from the configuration file if one is given, else the defaults, then applies
    /// overrides and the dataset filter, and validates the result.
    ///
    /// # Arguments
    ///
    /// * `args`: Command line arguments
    pub fn load(args: &CommandLineArgs) -> Result<Self, EtlError> {
        let mut config = match args.config_path()? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        if let Some(base_url) = &args.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(timeout) = args.timeout {
            config.timeout_secs = timeout;
        }
        config.select(&args.dataset)?;
        config.validate().map_err(EtlError::ConfigValidation)?;
        Ok(config)
    }
}
