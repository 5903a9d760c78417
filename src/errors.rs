//! Centralized error handling for cmip_testdata
//!
//! Every fallible operation in the crate returns [`Result`]. Underlying library
//! errors (NetCDF, I/O, HTTP, JSON) are wrapped unchanged so they surface at the
//! process boundary as they were raised.

use std::fmt;
use std::path::PathBuf;

/// Main error type for test-data preparation
#[derive(Debug)]
pub enum FetchError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Transport-level HTTP failure
    HttpError(reqwest::Error),

    /// Non-success HTTP status from an index or data node
    HttpStatus { status: u16, url: String },

    /// JSON decoding errors (catalog responses, query files)
    JsonError(serde_json::Error),

    /// Catalog answered with something we cannot interpret
    CatalogResponse(String),

    /// Downloaded or cached file does not match the catalog checksum
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Grid matches neither the lat/lon nor the i/j convention
    UnsupportedGrid { dims: Vec<String> },

    /// A lat/lon coordinate is not one-dimensional
    NonSeparableCoordinate { name: String, ndim: usize },

    /// A coordinate variable needed for selection is absent
    MissingCoordinate { name: String },

    /// Dataset record lacks a metadata field required for naming
    MissingField { field: String },

    /// Period string that is not YYYY, YYYY-MM or YYYY-MM-DD
    InvalidTimeSpan { value: String },

    /// CF time coordinate that cannot be decoded
    TimeDecode(String),

    /// Generic error for everything else
    Generic(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            FetchError::IoError(e) => write!(f, "I/O error: {}", e),
            FetchError::ArrayError(e) => write!(f, "Array error: {}", e),
            FetchError::HttpError(e) => write!(f, "HTTP error: {}", e),
            FetchError::HttpStatus { status, url } => {
                write!(f, "HTTP status {} from {}", status, url)
            }
            FetchError::JsonError(e) => write!(f, "JSON error: {}", e),
            FetchError::CatalogResponse(msg) => write!(f, "Unexpected catalog response: {}", msg),
            FetchError::ChecksumMismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "Checksum mismatch for {}: expected {}, got {}",
                path.display(),
                expected,
                actual
            ),
            FetchError::UnsupportedGrid { dims } => write!(
                f,
                "Cannot decimate this grid: unsupported dimensions [{}]",
                dims.join(", ")
            ),
            FetchError::NonSeparableCoordinate { name, ndim } => write!(
                f,
                "Coordinate '{}' must be one-dimensional, found {} dimensions",
                name, ndim
            ),
            FetchError::MissingCoordinate { name } => {
                write!(f, "Coordinate variable '{}' not found in dataset", name)
            }
            FetchError::MissingField { field } => {
                write!(f, "Dataset metadata has no field '{}'", field)
            }
            FetchError::InvalidTimeSpan { value } => write!(
                f,
                "Invalid period '{}': expected YYYY, YYYY-MM or YYYY-MM-DD",
                value
            ),
            FetchError::TimeDecode(msg) => write!(f, "Time decoding error: {}", msg),
            FetchError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::NetCDFError(e) => Some(e),
            FetchError::IoError(e) => Some(e),
            FetchError::ArrayError(e) => Some(e),
            FetchError::HttpError(e) => Some(e),
            FetchError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for FetchError {
    fn from(error: netcdf::Error) -> Self {
        FetchError::NetCDFError(error)
    }
}

impl From<std::io::Error> for FetchError {
    fn from(error: std::io::Error) -> Self {
        FetchError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for FetchError {
    fn from(error: ndarray::ShapeError) -> Self {
        FetchError::ArrayError(error)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        FetchError::HttpError(error)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::JsonError(error)
    }
}

/// Result type alias for cmip_testdata operations
pub type Result<T> = std::result::Result<T, FetchError>;
