//! Shared fixtures for the integration tests

#![allow(dead_code)]

use cmip_testdata::catalog::{Catalog, CatalogEntry};
use cmip_testdata::config::Facets;
use cmip_testdata::errors::{FetchError, Result};
use cmip_testdata::grid::{GridDataset, GridVariable, StorageType};
use cmip_testdata::record::DatasetRecord;
use ndarray::{ArrayD, IxDyn};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Day offsets of the first day of each month in a 365-day year.
pub const NOLEAP_MONTH_STARTS: [f64; 12] = [
    0.0, 31.0, 59.0, 90.0, 120.0, 151.0, 181.0, 212.0, 243.0, 273.0, 304.0, 334.0,
];

/// Monthly time values (first of month) in a noleap calendar.
pub fn monthly_noleap_days(years: usize) -> Vec<f64> {
    (0..years)
        .flat_map(|y| NOLEAP_MONTH_STARTS.iter().map(move |d| d + 365.0 * y as f64))
        .collect()
}

pub fn coordinate(name: &str, values: Vec<f64>) -> GridVariable {
    let len = values.len();
    GridVariable::new(
        name,
        &[name],
        StorageType::F64,
        ArrayD::from_shape_vec(IxDyn(&[len]), values).expect("1-D coordinate"),
    )
}

/// Time coordinate in days since `reference` for `calendar`.
pub fn time_coordinate(values: Vec<f64>, reference: &str, calendar: &str) -> GridVariable {
    coordinate("time", values)
        .with_attribute("units", format!("days since {}", reference))
        .with_attribute("calendar", calendar)
}

/// lat/lon dataset with an optional time axis; `var[t, y, x] = 100*y + x + 1000*t`.
pub fn latlon_dataset(var: &str, nlat: usize, nlon: usize, time: Option<GridVariable>) -> GridDataset {
    let mut ds = GridDataset::new();
    let ntime = time.as_ref().map(|t| t.data.len());

    if let Some(n) = ntime {
        ds.add_dimension("time", n);
    }
    ds.add_dimension("lat", nlat);
    ds.add_dimension("lon", nlon);

    if let Some(t) = time {
        ds.add_variable(t).expect("time coordinate");
    }
    ds.add_variable(
        coordinate("lat", (0..nlat).map(|i| -90.0 + i as f64).collect())
            .with_attribute("units", "degrees_north"),
    )
    .expect("lat coordinate");
    ds.add_variable(
        coordinate("lon", (0..nlon).map(|i| i as f64 * 2.0).collect())
            .with_attribute("units", "degrees_east"),
    )
    .expect("lon coordinate");

    let (dims, shape): (Vec<&str>, Vec<usize>) = match ntime {
        Some(n) => (vec!["time", "lat", "lon"], vec![n, nlat, nlon]),
        None => (vec!["lat", "lon"], vec![nlat, nlon]),
    };
    let has_time = ntime.is_some();
    let data = ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
        if has_time {
            1000.0 * idx[0] as f64 + 100.0 * idx[1] as f64 + idx[2] as f64
        } else {
            100.0 * idx[0] as f64 + idx[1] as f64
        }
    });
    ds.add_variable(
        GridVariable::new(var, &dims, StorageType::F32, data)
            .with_attribute("units", "K")
            .with_attribute("_FillValue", 1.0e20f32),
    )
    .expect("data variable");
    ds.add_attribute("title", "fixture");
    ds
}

/// Curvilinear i/j dataset; `var[t, j, i] = 1000*j + i`.
pub fn curvilinear_dataset(var: &str, nj: usize, ni: usize, time: Option<GridVariable>) -> GridDataset {
    let mut ds = GridDataset::new();
    let ntime = time.as_ref().map(|t| t.data.len());

    if let Some(n) = ntime {
        ds.add_dimension("time", n);
    }
    ds.add_dimension("j", nj);
    ds.add_dimension("i", ni);

    if let Some(t) = time {
        ds.add_variable(t).expect("time coordinate");
    }
    ds.add_variable(coordinate("j", (0..nj).map(|v| v as f64).collect()))
        .expect("j coordinate");
    ds.add_variable(coordinate("i", (0..ni).map(|v| v as f64).collect()))
        .expect("i coordinate");
    ds.add_variable(GridVariable::new(
        "latitude",
        &["j", "i"],
        StorageType::F64,
        ArrayD::from_shape_fn(IxDyn(&[nj, ni]), |idx| idx[0] as f64 * 0.5 - 80.0),
    ))
    .expect("2-D latitude");

    let (dims, shape): (Vec<&str>, Vec<usize>) = match ntime {
        Some(n) => (vec!["time", "j", "i"], vec![n, nj, ni]),
        None => (vec!["j", "i"], vec![nj, ni]),
    };
    let offset = if ntime.is_some() { 1 } else { 0 };
    let data = ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
        1000.0 * idx[offset] as f64 + idx[offset + 1] as f64
    });
    ds.add_variable(GridVariable::new(var, &dims, StorageType::F32, data))
        .expect("data variable");
    ds
}

pub fn cmip6_fields(variable_id: &str, table_id: &str, experiment_id: &str) -> BTreeMap<String, String> {
    [
        ("project", "CMIP6"),
        ("mip_era", "CMIP6"),
        ("activity_drs", "CMIP"),
        ("institution_id", "CSIRO"),
        ("source_id", "ACCESS-ESM1-5"),
        ("experiment_id", experiment_id),
        ("member_id", "r1i1p1f1"),
        ("table_id", table_id),
        ("variable_id", variable_id),
        ("grid_label", "gn"),
        ("version", "20191115"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn cmip6_key(fields: &BTreeMap<String, String>) -> String {
    [
        "mip_era",
        "activity_drs",
        "institution_id",
        "source_id",
        "experiment_id",
        "member_id",
        "table_id",
        "variable_id",
        "grid_label",
    ]
    .iter()
    .map(|f| fields[*f].as_str())
    .collect::<Vec<_>>()
    .join(".")
}

pub fn cmip6_record(variable_id: &str, table_id: &str, experiment_id: &str) -> DatasetRecord {
    let fields = cmip6_fields(variable_id, table_id, experiment_id);
    let mut record = DatasetRecord::new(cmip6_key(&fields));
    record.fields = fields;
    record
}

pub fn cmip6_entry(variable_id: &str, table_id: &str, experiment_id: &str, member_id: &str) -> CatalogEntry {
    let mut fields = cmip6_fields(variable_id, table_id, experiment_id);
    fields.insert("member_id".to_string(), member_id.to_string());
    let key = cmip6_key(&fields);
    CatalogEntry {
        dataset_ids: vec![format!("{}.v20191115|data.example.org", key)],
        key,
        fields,
    }
}

/// In-memory catalog: search matches entries whose fields equal one of the
/// values of every facet; resolution returns preset paths.
#[derive(Default)]
pub struct StaticCatalog {
    pub entries: Vec<CatalogEntry>,
    pub files: HashMap<String, Vec<PathBuf>>,
}

impl StaticCatalog {
    pub fn add(&mut self, entry: CatalogEntry, files: Vec<PathBuf>) {
        self.files.insert(entry.key.clone(), files);
        self.entries.push(entry);
    }
}

impl Catalog for StaticCatalog {
    fn search(&self, facets: &Facets) -> Result<Vec<CatalogEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| {
                facets.iter().all(|(name, value)| {
                    entry
                        .field(name)
                        .map(|actual| value.values().contains(&actual))
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect())
    }

    fn resolve(&self, entry: &CatalogEntry) -> Result<Vec<PathBuf>> {
        self.files
            .get(&entry.key)
            .cloned()
            .ok_or_else(|| FetchError::CatalogResponse(format!("no files for {}", entry.key)))
    }
}
