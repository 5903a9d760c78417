//! Dataset fetching
//!
//! Turns one [`SearchConfig`] into dataset records with local files attached.

use crate::catalog::{remove_ensembles, Catalog};
use crate::config::SearchConfig;
use crate::errors::Result;
use crate::record::DatasetRecord;
use tracing::info;

/// Search the catalog, optionally collapse ensembles, resolve files and stamp
/// the requested time span on every record.
///
/// # Errors
///
/// Search and resolution errors are returned as-is; no partial result is
/// produced.
pub fn fetch_datasets(catalog: &dyn Catalog, config: &SearchConfig) -> Result<Vec<DatasetRecord>> {
    let mut entries = catalog.search(&config.facets)?;
    if config.remove_ensembles {
        entries = remove_ensembles(entries);
    }

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        let files = catalog.resolve(&entry)?;
        info!("Resolved {} ({} files)", entry.key, files.len());

        let mut record = DatasetRecord::new(entry.key.clone()).with_files(files);
        record.fields = entry.fields;
        record.time_span = config.time_span.clone();
        records.push(record);
    }

    Ok(records)
}
