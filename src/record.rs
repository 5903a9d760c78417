//! Dataset records
//!
//! One row of catalog metadata describing a logical dataset, with the files
//! that realize it and the time span requested for it.

use crate::errors::{FetchError, Result};
use crate::time::TimeSpan;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Metadata, files and requested time span of one logical dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    /// Catalog identifier of the logical dataset
    pub key: String,
    /// Catalog facets and attributes (project, source_id, version, ...)
    pub fields: BTreeMap<String, String>,
    pub files: Vec<PathBuf>,
    pub time_span: Option<TimeSpan>,
}

impl DatasetRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: BTreeMap::new(),
            files: Vec::new(),
            time_span: None,
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    pub fn with_time_span(mut self, span: TimeSpan) -> Self {
        self.time_span = Some(span);
        self
    }

    /// A required metadata field.
    pub fn field(&self, name: &str) -> Result<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| FetchError::MissingField {
                field: name.to_string(),
            })
    }

    pub fn variable_id(&self) -> Result<&str> {
        self.field("variable_id")
    }

    /// Files whose name starts with `<variable_id>_`.
    ///
    /// Catalog results for fixed fields sometimes list auxiliary files
    /// (e.g. cell areas) alongside the requested variable.
    pub fn variable_files(&self) -> Result<Vec<&PathBuf>> {
        let variable_id = self.variable_id()?;
        Ok(self
            .files
            .iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| name.split('_').next())
                    == Some(variable_id)
            })
            .collect())
    }
}
