//! Search configurations
//!
//! The queries that define the test-data corpus. [`default_configs`] is the
//! corpus the project ships; [`load_configs`] reads the same structure from JSON
//! so a maintainer can fetch an ad-hoc selection.

use crate::errors::Result;
use crate::time::TimeSpan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Value of one search facet: a single value or any of several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FacetValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            FacetValue::Single(value) => vec![value.as_str()],
            FacetValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for FacetValue {
    fn from(value: &str) -> Self {
        FacetValue::Single(value.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for FacetValue {
    fn from(values: [&str; N]) -> Self {
        FacetValue::Multiple(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Facet name to value(s)
pub type Facets = BTreeMap<String, FacetValue>;

/// One catalog query plus the pipeline options applied to its results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub facets: Facets,
    /// Keep a single ensemble member per logical dataset
    #[serde(default)]
    pub remove_ensembles: bool,
    #[serde(default)]
    pub time_span: Option<TimeSpan>,
}

impl SearchConfig {
    pub fn new() -> Self {
        Self {
            facets: Facets::new(),
            remove_ensembles: false,
            time_span: None,
        }
    }

    pub fn facet(mut self, name: &str, value: impl Into<FacetValue>) -> Self {
        self.facets.insert(name.to_string(), value.into());
        self
    }

    pub fn remove_ensembles(mut self, remove: bool) -> Self {
        self.remove_ensembles = remove;
        self
    }

    pub fn time_span(mut self, start: &str, end: &str) -> Self {
        self.time_span = Some(TimeSpan::new(start, end));
        self
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The queries behind the reference test-data corpus.
pub fn default_configs() -> Vec<SearchConfig> {
    vec![
        // Example metric data
        SearchConfig::new()
            .facet("source_id", "ACCESS-ESM1-5")
            .facet("frequency", ["fx", "mon"])
            .facet(
                "variable_id",
                ["areacella", "tas", "tos", "rsut", "rlut", "rsdt"],
            )
            .facet("experiment_id", ["ssp126", "historical"])
            .remove_ensembles(true)
            .time_span("2000", "2025"),
        // ESMValTool ECS data
        SearchConfig::new()
            .facet("source_id", "ACCESS-ESM1-5")
            .facet("frequency", ["fx", "mon"])
            .facet("variable_id", ["areacella", "rlut", "rsdt", "rsut", "tas"])
            .facet("experiment_id", ["abrupt-4xCO2", "piControl"])
            .remove_ensembles(true)
            .time_span("0101", "0125"),
        // ESMValTool TCR data
        SearchConfig::new()
            .facet("source_id", "ACCESS-ESM1-5")
            .facet("frequency", ["fx", "mon"])
            .facet("variable_id", ["areacella", "tas"])
            .facet("experiment_id", ["1pctCO2", "piControl"])
            .remove_ensembles(true)
            .time_span("0101", "0180"),
        // obs4MIPs AIRS data
        SearchConfig::new()
            .facet("project", "obs4MIPs")
            .facet("institution_id", "NASA-JPL")
            .facet("frequency", "mon")
            .facet("source_id", "AIRS-2-1")
            .facet("variable_id", "ta")
            .remove_ensembles(false)
            .time_span("2002", "2016"),
    ]
}

/// Read a JSON list of search configurations.
pub fn load_configs(path: &Path) -> Result<Vec<SearchConfig>> {
    let content = fs::read_to_string(path)?;
    let configs = serde_json::from_str(&content)?;
    Ok(configs)
}
