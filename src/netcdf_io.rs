//! NetCDF I/O operations
//!
//! Loads a NetCDF file into a [`GridDataset`] and writes a (decimated) dataset
//! back out with dimensions, attributes and storage types preserved.

use crate::errors::Result;
use crate::grid::{GridDataset, GridVariable, StorageType};
use ndarray::ArrayD;
use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::{create, open, Variable};
use std::{fs, path::Path};
use tracing::{debug, warn};

macro_rules! read_as {
    ($var:expr, $ty:ty) => {
        $var.get_values::<$ty, _>(..)?
            .into_iter()
            .map(|v| v as f64)
            .collect::<Vec<f64>>()
    };
}

macro_rules! write_as {
    ($file:expr, $var:expr, $dims:expr, $ty:ty) => {{
        let mut new_var = $file.add_variable::<$ty>(&$var.name, $dims)?;
        for (name, value) in &$var.attributes {
            new_var.put_attribute(name, value.clone())?;
        }
        let values: Vec<$ty> = $var.data.iter().map(|&v| v as $ty).collect();
        new_var.put_values(&values, ..)?;
    }};
}

fn storage_type(vartype: &NcVariableType) -> Option<StorageType> {
    match vartype {
        NcVariableType::Int(IntType::I8) => Some(StorageType::I8),
        NcVariableType::Int(IntType::U8) => Some(StorageType::U8),
        NcVariableType::Int(IntType::I16) => Some(StorageType::I16),
        NcVariableType::Int(IntType::U16) => Some(StorageType::U16),
        NcVariableType::Int(IntType::I32) => Some(StorageType::I32),
        NcVariableType::Int(IntType::U32) => Some(StorageType::U32),
        NcVariableType::Int(IntType::I64) => Some(StorageType::I64),
        NcVariableType::Int(IntType::U64) => Some(StorageType::U64),
        NcVariableType::Float(FloatType::F32) => Some(StorageType::F32),
        NcVariableType::Float(FloatType::F64) => Some(StorageType::F64),
        _ => None,
    }
}

fn read_variable(var: &Variable, storage: StorageType) -> Result<GridVariable> {
    let dimensions: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let values = match storage {
        StorageType::I8 => read_as!(var, i8),
        StorageType::U8 => read_as!(var, u8),
        StorageType::I16 => read_as!(var, i16),
        StorageType::U16 => read_as!(var, u16),
        StorageType::I32 => read_as!(var, i32),
        StorageType::U32 => read_as!(var, u32),
        StorageType::I64 => read_as!(var, i64),
        StorageType::U64 => read_as!(var, u64),
        StorageType::F32 => read_as!(var, f32),
        StorageType::F64 => read_as!(var, f64),
    };

    let mut attributes = Vec::new();
    for attr in var.attributes() {
        attributes.push((attr.name().to_string(), attr.value()?));
    }

    Ok(GridVariable {
        name: var.name(),
        dimensions,
        storage,
        data: ArrayD::from_shape_vec(shape, values)?,
        attributes,
    })
}

/// Open a NetCDF file and load all numeric variables into memory.
pub fn open_dataset(path: &Path) -> Result<GridDataset> {
    let file = open(path)?;
    let mut dataset = GridDataset::new();

    for dim in file.dimensions() {
        dataset.add_dimension(&dim.name(), dim.len());
    }

    for attr in file.attributes() {
        dataset
            .attributes
            .push((attr.name().to_string(), attr.value()?));
    }

    for var in file.variables() {
        match storage_type(&var.vartype()) {
            Some(storage) => dataset.variables.push(read_variable(&var, storage)?),
            None => debug!(
                "Skipping non-numeric variable '{}' in {}",
                var.name(),
                path.display()
            ),
        }
    }

    debug!(
        "Loaded {} ({} dimensions, {} variables)",
        path.display(),
        dataset.dimensions.len(),
        dataset.variables.len()
    );
    Ok(dataset)
}

/// Write a dataset to `output_path`, replacing any existing file.
///
/// Attributes are written before data so `_FillValue` is defined in time for
/// netCDF-4 files. Nothing time-dependent is added, so identical input produces
/// identical output.
pub fn write_dataset(dataset: &GridDataset, output_path: &Path) -> Result<()> {
    if output_path.exists() {
        fs::remove_file(output_path)?;
    }

    let mut file = create(output_path)?;

    for dim in &dataset.dimensions {
        if dim.length == 0 {
            // A zero length would define an unlimited dimension.
            warn!(
                "Dimension '{}' is empty; writing it as unlimited",
                dim.name
            );
            file.add_unlimited_dimension(&dim.name)?;
        } else {
            file.add_dimension(&dim.name, dim.length)?;
        }
    }

    for (name, value) in &dataset.attributes {
        file.add_attribute(name, value.clone())?;
    }

    for var in &dataset.variables {
        let dims: Vec<&str> = var.dimensions.iter().map(|s| s.as_str()).collect();
        match var.storage {
            StorageType::I8 => write_as!(file, var, &dims, i8),
            StorageType::U8 => write_as!(file, var, &dims, u8),
            StorageType::I16 => write_as!(file, var, &dims, i16),
            StorageType::U16 => write_as!(file, var, &dims, u16),
            StorageType::I32 => write_as!(file, var, &dims, i32),
            StorageType::U32 => write_as!(file, var, &dims, u32),
            StorageType::I64 => write_as!(file, var, &dims, i64),
            StorageType::U64 => write_as!(file, var, &dims, u64),
            StorageType::F32 => write_as!(file, var, &dims, f32),
            StorageType::F64 => write_as!(file, var, &dims, f64),
        }
    }

    Ok(())
}

