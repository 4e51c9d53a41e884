//! Materialisation of sparse cube values into labelled flat records.

use crate::catalog::Catalog;
use crate::coords::linear_index_to_coords;
use crate::error::EtlError;
use crate::models::{checked_cell_count, CubeDocument};

/// Name of the unit-of-measure dimension
pub const UNIT_DIMENSION: &str = "unit";
/// Name of the geography dimension
pub const GEO_DIMENSION: &str = "geo";
/// Name of the time dimension
pub const TIME_DIMENSION: &str = "time";

/// A category along one dimension of a cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Coordinate {
    /// Category code
    pub code: String,
    /// Category label
    pub label: String,
    /// Category position
    pub position: usize,
}

/// One populated cube cell.
///
/// Only the unit, geography and time coordinates are kept. Other dimensions are decoded but
/// dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatRecord {
    /// Observed value
    pub value: Option<f64>,
    /// Unit of measure, if the cube has a unit dimension
    pub unit: Option<Coordinate>,
    /// Geography, if the cube has a geography dimension
    pub geo: Option<Coordinate>,
    /// Period
    pub time: Coordinate,
}

impl FlatRecord {
    /// Returns the unit code, if any.
    pub fn unit_code(&self) -> Option<&str> {
        self.unit.as_ref().map(|unit| unit.code.as_str())
    }

    /// Returns the geography code, if any.
    pub fn geo_code(&self) -> Option<&str> {
        self.geo.as_ref().map(|geo| geo.code.as_str())
    }
}

/// Turn every populated cell of a cube into a [FlatRecord].
///
/// Records are returned in the order the values appear in the document.
///
/// # Arguments
///
/// * `cube`: The cube document
/// * `catalog`: Catalog built from the same cube
pub fn materialize(cube: &CubeDocument, catalog: &Catalog) -> Result<Vec<FlatRecord>, EtlError> {
    if cube.value.is_empty() {
        return Err(EtlError::EmptyValues);
    }
    if catalog.get(TIME_DIMENSION).is_none() {
        return Err(EtlError::MissingTimeDimension);
    }
    let cells = checked_cell_count(&catalog.sizes).ok_or_else(|| EtlError::CellSpaceOverflow {
        sizes: catalog.sizes.clone(),
    })?;
    cube.value
        .iter()
        .map(|(key, value)| {
            let index = key.parse::<usize>().map_err(|source| EtlError::InvalidIndex {
                index: key.clone(),
                source,
            })?;
            if index >= cells {
                return Err(EtlError::IndexOutOfRange { index, cells });
            }
            materialize_cell(catalog, index, *value)
        })
        .collect()
}

/// Build the record of the cell at `index`.
fn materialize_cell(
    catalog: &Catalog,
    index: usize,
    value: Option<f64>,
) -> Result<FlatRecord, EtlError> {
    let coords = linear_index_to_coords(index, &catalog.sizes);
    let mut unit = None;
    let mut geo = None;
    let mut time = None;
    for (name, position) in std::iter::zip(&catalog.dim_ids, coords) {
        let dimension = catalog
            .get(name)
            .ok_or_else(|| EtlError::MissingDimension {
                dimension: name.clone(),
            })?;
        let code = dimension
            .code(position)
            .ok_or_else(|| EtlError::UnknownPosition {
                dimension: name.clone(),
                position,
            })?;
        let coordinate = Coordinate {
            code: code.to_string(),
            label: dimension.label(code).to_string(),
            position,
        };
        match name.as_str() {
            UNIT_DIMENSION => unit = Some(coordinate),
            GEO_DIMENSION => geo = Some(coordinate),
            TIME_DIMENSION => time = Some(coordinate),
            _ => (),
        }
    }
    Ok(FlatRecord {
        value,
        unit,
        geo,
        time: time.ok_or(EtlError::MissingTimeDimension)?,
    })
}
