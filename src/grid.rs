//! In-memory grid datasets
//!
//! A [`GridDataset`] holds everything the pipeline needs from one NetCDF file:
//! ordered dimensions, numeric variables with their attributes, and global
//! attributes. Variable data is kept as `f64` regardless of how it is stored on
//! disk; [`StorageType`] remembers the on-disk type so it can be written back
//! unchanged.

use crate::errors::{FetchError, Result};
use crate::time::{decode_times, Calendar, CalendarDate};
use ndarray::{ArrayD, Axis};
use netcdf::AttributeValue;

/// Name of the CF time dimension and coordinate.
pub const TIME: &str = "time";

/// On-disk numeric type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

/// A named dimension and its length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub length: usize,
}

/// One variable (data or coordinate) of a grid dataset
#[derive(Debug, Clone)]
pub struct GridVariable {
    pub name: String,
    pub dimensions: Vec<String>,
    pub storage: StorageType,
    pub data: ArrayD<f64>,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl GridVariable {
    pub fn new(name: &str, dimensions: &[&str], storage: StorageType, data: ArrayD<f64>) -> Self {
        Self {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            storage,
            data,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value)
    }

    /// Value of a text attribute, if present and textual.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        match self.attribute(name)? {
            AttributeValue::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }
}

/// Dimensions, variables and global attributes loaded from one file
#[derive(Debug, Clone, Default)]
pub struct GridDataset {
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<GridVariable>,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl GridDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dimension(&mut self, name: &str, length: usize) {
        self.dimensions.push(Dimension {
            name: name.to_string(),
            length,
        });
    }

    /// Add a variable, checking its dimensions exist and match the data shape.
    pub fn add_variable(&mut self, variable: GridVariable) -> Result<()> {
        let expected: Vec<usize> = variable
            .dimensions
            .iter()
            .map(|d| {
                self.dim_len(d).ok_or_else(|| {
                    FetchError::Generic(format!(
                        "Variable '{}' uses undefined dimension '{}'",
                        variable.name, d
                    ))
                })
            })
            .collect::<Result<_>>()?;

        if expected != variable.data.shape() {
            return Err(FetchError::Generic(format!(
                "Variable '{}' has shape {:?} but its dimensions imply {:?}",
                variable.name,
                variable.data.shape(),
                expected
            )));
        }

        self.variables.push(variable);
        Ok(())
    }

    pub fn add_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.attributes.push((name.to_string(), value.into()));
    }

    pub fn has_dim(&self, name: &str) -> bool {
        self.dimensions.iter().any(|d| d.name == name)
    }

    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.length)
    }

    pub fn dim_names(&self) -> Vec<String> {
        self.dimensions.iter().map(|d| d.name.clone()).collect()
    }

    pub fn variable(&self, name: &str) -> Option<&GridVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Select `indices` along dimension `dim` in every variable that uses it.
    pub fn isel(&self, dim: &str, indices: &[usize]) -> Result<GridDataset> {
        let length = self.dim_len(dim).ok_or_else(|| {
            FetchError::Generic(format!("Dimension '{}' not found in dataset", dim))
        })?;
        if let Some(&bad) = indices.iter().find(|&&i| i >= length) {
            return Err(FetchError::Generic(format!(
                "Index {} out of bounds for dimension '{}' of length {}",
                bad, dim, length
            )));
        }

        let dimensions = self
            .dimensions
            .iter()
            .map(|d| Dimension {
                name: d.name.clone(),
                length: if d.name == dim { indices.len() } else { d.length },
            })
            .collect();

        let variables = self
            .variables
            .iter()
            .map(|var| match var.dimensions.iter().position(|d| d == dim) {
                Some(axis) => GridVariable {
                    data: var.data.select(Axis(axis), indices),
                    ..var.clone()
                },
                None => var.clone(),
            })
            .collect();

        Ok(GridDataset {
            dimensions,
            variables,
            attributes: self.attributes.clone(),
        })
    }

    /// Decoded dates of the `time` coordinate, or `None` without a time dimension.
    pub fn time_coordinate(&self) -> Result<Option<Vec<CalendarDate>>> {
        if !self.has_dim(TIME) {
            return Ok(None);
        }

        let time = self
            .variable(TIME)
            .ok_or_else(|| FetchError::MissingCoordinate {
                name: TIME.to_string(),
            })?;
        let units = time.attribute_str("units").ok_or_else(|| {
            FetchError::TimeDecode("time coordinate has no 'units' attribute".to_string())
        })?;
        let calendar = match time.attribute_str("calendar") {
            Some(name) => Calendar::parse(name)?,
            None => Calendar::Standard,
        };

        let values: Vec<f64> = time.data.iter().copied().collect();
        decode_times(&values, units, calendar).map(Some)
    }
}
