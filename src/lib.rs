//! cmip_testdata: reference test data from ESGF
//!
//! Builds a small, reproducible NetCDF corpus for exercising climate-model
//! evaluation code. Datasets are searched on an ESGF index node, merged across
//! queries, cut down to a 10×10 horizontal patch and a requested time window,
//! written under a CMIP6/obs4MIPs directory layout and listed with their
//! SHA-256 checksums in a registry file.
//!
//! ## Module Organization
//!
//! - [`config`]: search configurations and the default corpus queries
//! - [`catalog`]: catalog interface and the ESGF implementation
//! - [`fetch`]: search + ensemble removal + file resolution
//! - [`dedupe`]: merging records that describe the same dataset
//! - [`grid`]: in-memory grid datasets
//! - [`netcdf_io`]: reading and writing NetCDF files
//! - [`decimate`]: spatial and temporal decimation
//! - [`naming`]: output directory and filename conventions
//! - [`registry`]: checksum registry
//! - [`time`]: CF calendars and requested time spans
//! - [`pipeline`]: the end-to-end run
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cmip_testdata::prelude::*;
//! use std::path::Path;
//!
//! let catalog = EsgfCatalog::new(DEFAULT_INDEX_NODE, EsgfCatalog::default_cache_dir()?)?;
//! let pipeline = Pipeline::new(&catalog, Path::new("data"), Path::new("registry.txt"));
//! let summary = pipeline.run(&default_configs())?;
//! println!("wrote {} files", summary.files_written);
//! # Ok::<(), cmip_testdata::FetchError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod decimate;
pub mod dedupe;
pub mod errors;
pub mod fetch;
pub mod grid;
pub mod naming;
pub mod netcdf_io;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod time;

pub use errors::{FetchError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::catalog::{Catalog, CatalogEntry, EsgfCatalog, DEFAULT_INDEX_NODE};
    pub use crate::config::{default_configs, load_configs, FacetValue, Facets, SearchConfig};
    pub use crate::decimate::{decimate_dataset, GridKind};
    pub use crate::dedupe::deduplicate_datasets;
    pub use crate::errors::{FetchError, Result};
    pub use crate::fetch::fetch_datasets;
    pub use crate::grid::{GridDataset, GridVariable, StorageType};
    pub use crate::naming::{create_out_filename, NamingSchema};
    pub use crate::netcdf_io::{open_dataset, write_dataset};
    pub use crate::pipeline::{Pipeline, PipelineSummary};
    pub use crate::record::DatasetRecord;
    pub use crate::registry::make_registry;
    pub use crate::time::TimeSpan;
}
