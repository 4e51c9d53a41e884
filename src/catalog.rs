//! Per-dimension category lookup built from cube metadata.

use crate::error::EtlError;
use crate::models::{Category, CubeDocument};

use hashbrown::HashMap;
use indexmap::IndexMap;

/// Category lookup for a single dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct DimensionCatalog {
    /// Category code to position
    pub index: IndexMap<String, usize>,
    /// Position to category code
    pub inv_index: HashMap<usize, String>,
    /// Category code to label
    pub labels: IndexMap<String, String>,
    /// Declared number of categories
    pub size: usize,
}

impl DimensionCatalog {
    /// Build the lookup for one dimension's category metadata.
    ///
    /// Positions come from the category index when it is present and non-empty. Otherwise they
    /// are assigned 0, 1, 2, ... to the label keys in document order. That fallback depends on
    /// the upstream document keeping its key order stable, and is deliberately not sorted.
    ///
    /// The size is the declared `length` when present, else the number of codes.
    pub fn new(category: &Category) -> Self {
        let index: IndexMap<String, usize> = if category.index.is_empty() {
            category
                .label
                .keys()
                .enumerate()
                .map(|(position, code)| (code.clone(), position))
                .collect()
        } else {
            category.index.clone()
        };
        let inv_index = index
            .iter()
            .map(|(code, position)| (*position, code.clone()))
            .collect();
        let size = category.length.unwrap_or(index.len());
        Self {
            index,
            inv_index,
            labels: category.label.clone(),
            size,
        }
    }

    /// Returns the code at `position`, if any.
    pub fn code(&self, position: usize) -> Option<&str> {
        self.inv_index.get(&position).map(String::as_str)
    }

    /// Returns the label of `code`, falling back to the code itself.
    pub fn label<'a>(&'a self, code: &'a str) -> &'a str {
        self.labels.get(code).map(String::as_str).unwrap_or(code)
    }
}

/// Category lookups for every dimension of a cube.
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    /// Ordered dimension names
    pub dim_ids: Vec<String>,
    /// Dimension sizes, parallel to `dim_ids`
    pub sizes: Vec<usize>,
    /// Lookup per dimension name
    pub dimensions: HashMap<String, DimensionCatalog>,
}

impl Catalog {
    /// Build the catalog of a cube.
    ///
    /// Fails with [EtlError::MissingDimension] when a dimension named in `id` has no metadata.
    ///
    /// # Arguments
    ///
    /// * `cube`: The cube document
    pub fn build(cube: &CubeDocument) -> Result<Self, EtlError> {
        let dimensions = cube
            .id
            .iter()
            .map(|name| {
                let dimension =
                    cube.dimension
                        .get(name)
                        .ok_or_else(|| EtlError::MissingDimension {
                            dimension: name.clone(),
                        })?;
                Ok((name.clone(), DimensionCatalog::new(&dimension.category)))
            })
            .collect::<Result<HashMap<_, _>, EtlError>>()?;
        Ok(Self {
            dim_ids: cube.id.clone(),
            sizes: cube.size.clone(),
            dimensions,
        })
    }

    /// Returns the lookup of the named dimension, if any.
    pub fn get(&self, name: &str) -> Option<&DimensionCatalog> {
        self.dimensions.get(name)
    }
}
