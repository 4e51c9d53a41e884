//! Data types and associated functions and methods
//!
//! The input side is the JSON-stat cube document returned by the statistics API. The output side
//! is the pair of projections and the envelope that wraps them on disk.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// Sparse mapping from stringified linear index to value.
///
/// A present key with a `None` value is an observation whose value is missing.
pub type ValueMap = IndexMap<String, Option<f64>>;

/// Category metadata of a single dimension
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Category {
    /// Category code to position
    #[serde(default, deserialize_with = "deserialize_category_index")]
    pub index: IndexMap<String, usize>,
    /// Category code to human readable label
    #[serde(default)]
    pub label: IndexMap<String, String>,
    /// Declared number of categories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

/// Metadata of a single dimension
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Dimension {
    /// Human readable name of the dimension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Categories of the dimension
    pub category: Category,
}

/// A JSON-stat cube document
///
/// Cells are addressed by a linear index into a row-major layout over the dimensions listed in
/// `id`, with the last dimension varying fastest.
// NOTE: Key order of the maps is preserved. Position fallback in the catalog and record order in
// the projections both depend on it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[validate(schema(function = "validate_cube"))]
pub struct CubeDocument {
    /// Ordered dimension names
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: Vec<String>,
    /// Dimension sizes, parallel to `id`
    #[validate(
        length(min = 1, message = "size must not be empty"),
        custom = "validate_size"
    )]
    pub size: Vec<usize>,
    /// Dimension metadata keyed by dimension name
    #[serde(default)]
    pub dimension: IndexMap<String, Dimension>,
    /// Observations keyed by stringified linear index
    #[serde(default, deserialize_with = "deserialize_values")]
    pub value: ValueMap,
}

impl CubeDocument {
    /// Returns the number of addressable cells.
    ///
    /// Returns `None` if the product of the dimension sizes overflows.
    pub fn cell_count(&self) -> Option<usize> {
        checked_cell_count(&self.size)
    }
}

/// Returns the product of `sizes`, or `None` on overflow.
pub fn checked_cell_count(sizes: &[usize]) -> Option<usize> {
    sizes
        .iter()
        .try_fold(1usize, |cells, size| cells.checked_mul(*size))
}

/// Validate dimension sizes
fn validate_size(size: &[usize]) -> Result<(), ValidationError> {
    if size.iter().any(|size| *size == 0) {
        return Err(ValidationError::new("dimension sizes must be greater than 0"));
    }
    if checked_cell_count(size).is_none() {
        return Err(ValidationError::new(
            "number of cells must not overflow the index range",
        ));
    }
    Ok(())
}

/// Validate a cube document
fn validate_cube(cube: &CubeDocument) -> Result<(), ValidationError> {
    if cube.id.len() != cube.size.len() {
        let mut error = ValidationError::new("id and size must have the same length");
        error.add_param("id".into(), &cube.id.len());
        error.add_param("size".into(), &cube.size.len());
        return Err(error);
    }
    Ok(())
}

/// Category index as it may appear on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireCategoryIndex {
    Positions(IndexMap<String, usize>),
    Codes(Vec<String>),
}

/// Deserialise a category index given either as a code to position object or as an array of
/// codes in position order.
fn deserialize_category_index<'de, D>(deserializer: D) -> Result<IndexMap<String, usize>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match WireCategoryIndex::deserialize(deserializer)? {
        WireCategoryIndex::Positions(positions) => positions,
        WireCategoryIndex::Codes(codes) => codes
            .into_iter()
            .enumerate()
            .map(|(position, code)| (code, position))
            .collect(),
    })
}

/// Values as they may appear on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireValues {
    Sparse(ValueMap),
    Dense(Vec<Option<f64>>),
}

/// Deserialise cube values given either sparsely as an object or densely as an array.
///
/// In the dense form a `null` entry is an absent observation.
fn deserialize_values<'de, D>(deserializer: D) -> Result<ValueMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match WireValues::deserialize(deserializer)? {
        WireValues::Sparse(values) => values,
        WireValues::Dense(values) => values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| value.map(|value| (index.to_string(), Some(value))))
            .collect(),
    })
}

/// One geography's value in the most recent period.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LatestRecord {
    /// Geography code
    pub country_code: Option<String>,
    /// Geography label
    pub country: Option<String>,
    /// Label of the most recent period
    pub time: String,
    /// Observed value
    pub value_pct_gdp: Option<f64>,
}

/// One period of a geography's series.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Period label
    pub time: String,
    /// Observed value
    pub value_pct_gdp: Option<f64>,
}

/// A geography's values ordered by period.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CountrySeries {
    /// Geography code
    pub country_code: String,
    /// Geography label
    pub country: String,
    /// Unit label
    pub unit: String,
    /// Points in ascending period order
    pub series: Vec<SeriesPoint>,
}

/// Envelope written to disk around a projection.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DatasetEnvelope<R> {
    /// Upper-cased dataset identifier
    pub dataset: String,
    /// Human readable description
    pub description: String,
    /// URL the cube was fetched from
    pub source_url: String,
    /// RFC 3339 generation timestamp in UTC
    pub updated_at: String,
    /// Label of the most recent period
    pub latest_period: String,
    /// Unit label
    pub unit: String,
    /// Projection records
    pub records: Vec<R>,
    /// Provenance notes
    pub notes: Vec<String>,
}

/// Envelope of the latest-period projection.
pub type LatestEnvelope = DatasetEnvelope<LatestRecord>;

/// Envelope of the timeseries projection.
pub type TimeseriesEnvelope = DatasetEnvelope<CountrySeries>;
