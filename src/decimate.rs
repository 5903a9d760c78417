//! Spatial and temporal decimation
//!
//! Cuts a dataset down to a small excerpt: a 10×10 horizontal patch and, when a
//! time span is given, the time steps inside it.

use crate::errors::{FetchError, Result};
use crate::grid::{GridDataset, TIME};
use crate::time::TimeSpan;
use std::ops::Range;
use tracing::debug;

/// Points kept along each horizontal dimension
pub const DECIMATED_POINTS: usize = 10;

/// Horizontal grid convention of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKind {
    /// Rectilinear grid with 1-D `lat` and `lon`
    LatLon,
    /// Curvilinear (usually ocean) grid indexed by `i` and `j`
    Curvilinear,
}

impl GridKind {
    pub fn detect(dataset: &GridDataset) -> Option<Self> {
        if dataset.has_dim("lat") && dataset.has_dim("lon") {
            Some(Self::LatLon)
        } else if dataset.has_dim("i") && dataset.has_dim("j") {
            Some(Self::Curvilinear)
        } else {
            None
        }
    }
}

/// Leading window along a dimension of length `len`.
fn head(len: usize) -> Range<usize> {
    0..len.min(DECIMATED_POINTS)
}

/// Window along `j` centred on its midpoint, clamped to the grid.
///
/// The middle of an ocean grid is more likely to hold valid (non-land) values
/// than its edges. This is a heuristic; some grids will still be all-missing.
pub fn j_window(len: usize) -> Range<usize> {
    let midpoint = len / 2;
    let start = midpoint.saturating_sub(DECIMATED_POINTS / 2);
    let end = (start + DECIMATED_POINTS).min(len);
    end.saturating_sub(DECIMATED_POINTS)..end
}

fn require_1d_coordinate(dataset: &GridDataset, name: &str) -> Result<()> {
    let coord = dataset
        .variable(name)
        .ok_or_else(|| FetchError::MissingCoordinate {
            name: name.to_string(),
        })?;
    if coord.ndim() != 1 {
        return Err(FetchError::NonSeparableCoordinate {
            name: name.to_string(),
            ndim: coord.ndim(),
        });
    }
    Ok(())
}

fn select_range(dataset: &GridDataset, dim: &str, range: Range<usize>) -> Result<GridDataset> {
    let indices: Vec<usize> = range.collect();
    dataset.isel(dim, &indices)
}

/// Reduce a dataset to a small excerpt.
///
/// Returns `Ok(None)` when a time span is given and no time step falls inside
/// it.
///
/// # Errors
///
/// - [`FetchError::UnsupportedGrid`] if the grid is neither lat/lon nor i/j
/// - [`FetchError::NonSeparableCoordinate`] if `lat` or `lon` is not 1-D
/// - time decoding errors when clipping
pub fn decimate_dataset(
    dataset: &GridDataset,
    time_span: Option<&TimeSpan>,
) -> Result<Option<GridDataset>> {
    let mut result = match GridKind::detect(dataset) {
        Some(GridKind::LatLon) => {
            require_1d_coordinate(dataset, "lat")?;
            require_1d_coordinate(dataset, "lon")?;
            let lat_len = dataset.dim_len("lat").unwrap_or(0);
            let lon_len = dataset.dim_len("lon").unwrap_or(0);
            let subset = select_range(dataset, "lat", head(lat_len))?;
            select_range(&subset, "lon", head(lon_len))?
        }
        Some(GridKind::Curvilinear) => {
            let i_len = dataset.dim_len("i").unwrap_or(0);
            let j_len = dataset.dim_len("j").unwrap_or(0);
            let subset = select_range(dataset, "i", head(i_len))?;
            select_range(&subset, "j", j_window(j_len))?
        }
        None => {
            return Err(FetchError::UnsupportedGrid {
                dims: dataset.dim_names(),
            })
        }
    };

    if let (true, Some(span)) = (dataset.has_dim(TIME), time_span) {
        let lower = span.lower_bound()?;
        let upper = span.upper_bound()?;
        let dates = result.time_coordinate()?.unwrap_or_default();
        let keep: Vec<usize> = dates
            .iter()
            .enumerate()
            .filter(|(_, date)| lower <= **date && **date < upper)
            .map(|(index, _)| index)
            .collect();

        debug!(
            "Time clip {}..{} keeps {} of {} steps",
            span.start,
            span.end,
            keep.len(),
            dates.len()
        );
        if keep.is_empty() {
            return Ok(None);
        }
        result = result.isel(TIME, &keep)?;
    }

    Ok(Some(result))
}
