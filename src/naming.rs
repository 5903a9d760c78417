//! Output path naming
//!
//! Output files follow the CMIP6 / obs4MIPs data reference syntax: a directory
//! per metadata field, a `v<version>` leaf, and a filename built from a subset
//! of the same fields plus the covered months.

use crate::errors::{FetchError, Result};
use crate::grid::GridDataset;
use crate::record::DatasetRecord;
use std::path::PathBuf;

/// Extension of every written file
pub const EXTENSION: &str = "nc";

/// Metadata schema used to name a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingSchema {
    Cmip6,
    Obs4Mips,
}

impl NamingSchema {
    /// `obs4MIPs` records use their own schema; everything else is CMIP6.
    pub fn for_project(project: &str) -> Self {
        if project == "obs4MIPs" {
            Self::Obs4Mips
        } else {
            Self::Cmip6
        }
    }

    pub fn path_fields(self) -> &'static [&'static str] {
        match self {
            Self::Cmip6 => &[
                "mip_era",
                "activity_drs",
                "institution_id",
                "source_id",
                "experiment_id",
                "member_id",
                "table_id",
                "variable_id",
                "grid_label",
            ],
            Self::Obs4Mips => &[
                "activity_id",
                "institution_id",
                "source_id",
                "variable_id",
                "grid_label",
            ],
        }
    }

    pub fn filename_fields(self) -> &'static [&'static str] {
        match self {
            Self::Cmip6 => &[
                "variable_id",
                "table_id",
                "source_id",
                "experiment_id",
                "member_id",
                "grid_label",
            ],
            Self::Obs4Mips => &["variable_id", "source_id", "grid_label"],
        }
    }
}

/// Relative output path for a decimated dataset.
///
/// The `_<YYYYMM>-<YYYYMM>` suffix comes from the dataset's own time
/// coordinate, not from the span requested for the record.
///
/// # Errors
///
/// [`FetchError::MissingField`] if the record lacks a field of its schema.
pub fn create_out_filename(metadata: &DatasetRecord, dataset: &GridDataset) -> Result<PathBuf> {
    let schema = NamingSchema::for_project(metadata.field("project")?);

    let mut output_path = PathBuf::new();
    for field in schema.path_fields() {
        output_path.push(metadata.field(field)?);
    }
    output_path.push(format!("v{}", metadata.field("version")?));

    let prefix = schema
        .filename_fields()
        .iter()
        .map(|field| metadata.field(field))
        .collect::<Result<Vec<_>>>()?
        .join("_");

    let filename = match dataset.time_coordinate()? {
        Some(dates) => {
            let first = dates
                .iter()
                .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let last = dates
                .iter()
                .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            match (first, last) {
                (Some(first), Some(last)) => format!(
                    "{}_{}-{}.{}",
                    prefix,
                    first.yyyymm(),
                    last.yyyymm(),
                    EXTENSION
                ),
                _ => {
                    return Err(FetchError::TimeDecode(
                        "time coordinate is empty".to_string(),
                    ))
                }
            }
        }
        None => format!("{}.{}", prefix, EXTENSION),
    };

    Ok(output_path.join(filename))
}
