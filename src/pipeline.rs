//! The fetch → dedupe → decimate → write → registry pipeline

use crate::catalog::Catalog;
use crate::config::SearchConfig;
use crate::decimate::decimate_dataset;
use crate::dedupe::deduplicate_datasets;
use crate::errors::Result;
use crate::fetch::fetch_datasets;
use crate::naming::create_out_filename;
use crate::netcdf_io::{open_dataset, write_dataset};
use crate::registry::make_registry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Distinct datasets after deduplication
    pub datasets: usize,
    pub files_written: usize,
    /// Files whose time clip was empty
    pub files_skipped: usize,
    pub registry_entries: usize,
}

/// Test-data preparation run against one catalog and output location
pub struct Pipeline<'a> {
    catalog: &'a dyn Catalog,
    output_root: PathBuf,
    registry_path: PathBuf,
}

impl<'a> Pipeline<'a> {
    pub fn new(catalog: &'a dyn Catalog, output_root: &Path, registry_path: &Path) -> Self {
        Self {
            catalog,
            output_root: output_root.to_path_buf(),
            registry_path: registry_path.to_path_buf(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Fetch every configuration, then decimate and write each matching file.
    ///
    /// # Errors
    ///
    /// Stops at the first error; files already written stay on disk.
    pub fn run(&self, configs: &[SearchConfig]) -> Result<PipelineSummary> {
        let mut collected = Vec::new();
        for config in configs {
            collected.extend(fetch_datasets(self.catalog, config)?);
        }

        let datasets = deduplicate_datasets(collected)?;
        info!("{} distinct datasets to process", datasets.len());

        let mut summary = PipelineSummary {
            datasets: datasets.len(),
            ..PipelineSummary::default()
        };

        for dataset in &datasets {
            for source in dataset.variable_files()? {
                let original = open_dataset(source)?;
                let decimated = match decimate_dataset(&original, dataset.time_span.as_ref())? {
                    Some(decimated) => decimated,
                    None => {
                        debug!("No time steps in range for {}", source.display());
                        summary.files_skipped += 1;
                        continue;
                    }
                };

                let output_path = self
                    .output_root
                    .join(create_out_filename(dataset, &decimated)?);
                if let Some(parent) = output_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                write_dataset(&decimated, &output_path)?;
                info!("Wrote {}", output_path.display());
                summary.files_written += 1;
            }
        }

        fs::create_dir_all(&self.output_root)?;
        summary.registry_entries = make_registry(&self.output_root, &self.registry_path)?;
        Ok(summary)
    }
}
