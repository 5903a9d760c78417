//! End-to-end tests on real NetCDF files in temporary directories

mod common;

use assert_matches::assert_matches;
use cmip_testdata::{
    config::SearchConfig,
    errors::{FetchError, Result},
    grid::StorageType,
    netcdf_io::{open_dataset, write_dataset},
    pipeline::{Pipeline, PipelineSummary},
    registry::{file_hash, make_registry},
};
use common::*;
use ndarray::Array2;
use netcdf::{create, AttributeValue};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn registry_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read registry")
        .lines()
        .map(str::to_string)
        .collect()
}

fn registry_paths(path: &Path) -> Vec<String> {
    registry_lines(path)
        .iter()
        .map(|line| line.split(' ').next().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_write_and_open_round_trip() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("tas.nc");

    let time = time_coordinate(monthly_noleap_days(1), "2000-01-01", "noleap");
    let original = latlon_dataset("tas", 4, 5, Some(time));
    write_dataset(&original, &file_path)?;

    let loaded = open_dataset(&file_path)?;
    assert_eq!(loaded.dim_names(), vec!["time", "lat", "lon"]);
    assert_eq!(loaded.dim_len("time"), Some(12));

    let tas = loaded.variable("tas").expect("tas present");
    assert_eq!(tas.storage, StorageType::F32);
    assert_eq!(tas.dimensions, vec!["time", "lat", "lon"]);
    assert_eq!(tas.data, original.variable("tas").expect("tas present").data);
    assert_eq!(tas.attribute_str("units"), Some("K"));
    assert_matches!(
        tas.attribute("_FillValue"),
        Some(AttributeValue::Float(v)) if *v == 1.0e20
    );

    let time = loaded.variable("time").expect("time present");
    assert_eq!(time.storage, StorageType::F64);
    assert_eq!(time.attribute_str("calendar"), Some("noleap"));

    assert_matches!(
        loaded.attributes.iter().find(|(name, _)| name == "title"),
        Some((_, AttributeValue::Str(title))) if title == "fixture"
    );

    // Writing again replaces the file rather than failing
    write_dataset(&loaded, &file_path)?;
    assert_eq!(open_dataset(&file_path)?.variables.len(), 4);
    Ok(())
}

#[test]
fn test_open_preserves_integer_storage() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("sftlf.nc");

    {
        let mut file = create(&file_path)?;
        file.add_dimension("lat", 2)?;
        file.add_dimension("lon", 3)?;

        let mut var = file.add_variable::<i16>("sftlf", &["lat", "lon"])?;
        var.put_attribute("units", "%")?;
        let data = Array2::from_shape_vec((2, 3), vec![0i16, 50, 100, 100, 50, 0])?;
        var.put(data.view(), ..)?;

        file.add_attribute("source", "hand written")?;
    }

    let loaded = open_dataset(&file_path)?;
    let sftlf = loaded.variable("sftlf").expect("sftlf present");
    assert_eq!(sftlf.storage, StorageType::I16);
    assert_eq!(sftlf.data.shape(), &[2, 3]);
    assert_eq!(sftlf.data[[1, 0]], 100.0);

    let copy_path = temp_dir.path().join("copy.nc");
    write_dataset(&loaded, &copy_path)?;
    let copy = open_dataset(&copy_path)?;
    assert_eq!(copy.variable("sftlf").map(|v| v.storage), Some(StorageType::I16));
    Ok(())
}

#[test]
fn test_open_missing_file() {
    let result = open_dataset(Path::new("/nonexistent/tas.nc"));
    assert_matches!(result, Err(FetchError::NetCDFError(_)));
}

#[test]
fn test_make_registry_sorted_and_stable() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let root = temp_dir.path().join("data");
    fs::create_dir_all(root.join("obs4MIPs/NASA-JPL"))?;
    fs::create_dir_all(root.join("CMIP6/CMIP"))?;
    fs::write(root.join("obs4MIPs/NASA-JPL/ta.nc"), b"ta")?;
    fs::write(root.join("CMIP6/CMIP/tas.nc"), b"tas")?;
    fs::write(root.join("CMIP6/areacella.nc"), b"areacella")?;

    // Registry inside the scanned directory is not listed
    let registry = root.join("registry.txt");
    let count = make_registry(&root, &registry)?;
    assert_eq!(count, 3);
    assert_eq!(count, make_registry(&root, &registry)?);

    let lines = registry_lines(&registry);
    assert_eq!(
        registry_paths(&registry),
        vec![
            "CMIP6/CMIP/tas.nc",
            "CMIP6/areacella.nc",
            "obs4MIPs/NASA-JPL/ta.nc",
        ]
    );
    assert_eq!(
        lines[0],
        format!("CMIP6/CMIP/tas.nc {}", file_hash(&root.join("CMIP6/CMIP/tas.nc"))?)
    );

    let first_run = fs::read_to_string(&registry)?;
    make_registry(&root, &registry)?;
    assert_eq!(fs::read_to_string(&registry)?, first_run);
    Ok(())
}

#[test]
fn test_file_hash_known_value() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("abc.txt");
    fs::write(&path, b"abc")?;
    assert_eq!(
        file_hash(&path)?,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    Ok(())
}

/// Catalog with a tas file spanning 2000-2001, an areacella file plus an
/// unrelated listed file, and a tos file from 1850.
fn corpus_catalog(cache: &Path) -> Result<StaticCatalog> {
    fs::create_dir_all(cache)?;

    let tas_path = cache.join("tas_Amon_ACCESS-ESM1-5_historical_r1i1p1f1_gn_200001-200112.nc");
    let time = time_coordinate(monthly_noleap_days(2), "2000-01-01", "noleap");
    write_dataset(&latlon_dataset("tas", 20, 30, Some(time)), &tas_path)?;

    let area_path = cache.join("areacella_fx_ACCESS-ESM1-5_historical_r1i1p1f1_gn.nc");
    write_dataset(&latlon_dataset("areacella", 15, 15, None), &area_path)?;

    let tos_path = cache.join("tos_Omon_ACCESS-ESM1-5_historical_r1i1p1f1_gn_185001-185012.nc");
    let time = time_coordinate(monthly_noleap_days(1), "1850-01-01", "noleap");
    write_dataset(&curvilinear_dataset("tos", 30, 20, Some(time)), &tos_path)?;

    let mut catalog = StaticCatalog::default();
    catalog.add(
        cmip6_entry("tas", "Amon", "historical", "r1i1p1f1"),
        vec![tas_path],
    );
    catalog.add(
        cmip6_entry("areacella", "fx", "historical", "r1i1p1f1"),
        vec![
            area_path,
            // Never opened: filtered out by variable name
            cache.join("orog_fx_ACCESS-ESM1-5_historical_r1i1p1f1_gn.nc"),
        ],
    );
    catalog.add(
        cmip6_entry("tos", "Omon", "historical", "r1i1p1f1"),
        vec![tos_path],
    );
    Ok(catalog)
}

fn corpus_configs() -> Vec<SearchConfig> {
    vec![
        SearchConfig::new()
            .facet("source_id", "ACCESS-ESM1-5")
            .facet("variable_id", ["tas", "areacella", "tos"])
            .remove_ensembles(true)
            .time_span("2000", "2000"),
        SearchConfig::new()
            .facet("variable_id", "tas")
            .time_span("2001", "2001"),
    ]
}

#[test]
fn test_pipeline_end_to_end() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let catalog = corpus_catalog(&temp_dir.path().join("cache"))?;
    let output = temp_dir.path().join("data");
    let registry = temp_dir.path().join("registry.txt");

    let pipeline = Pipeline::new(&catalog, &output, &registry);
    assert_eq!(pipeline.output_root(), output.as_path());

    let summary = pipeline.run(&corpus_configs())?;
    assert_eq!(
        summary,
        PipelineSummary {
            datasets: 3,
            files_written: 2,
            files_skipped: 1,
            registry_entries: 2,
        }
    );

    let tas_rel = PathBuf::from(
        "CMIP6/CMIP/CSIRO/ACCESS-ESM1-5/historical/r1i1p1f1/Amon/tas/gn/v20191115",
    )
    .join("tas_Amon_ACCESS-ESM1-5_historical_r1i1p1f1_gn_200001-200112.nc");
    let area_rel = PathBuf::from(
        "CMIP6/CMIP/CSIRO/ACCESS-ESM1-5/historical/r1i1p1f1/fx/areacella/gn/v20191115",
    )
    .join("areacella_fx_ACCESS-ESM1-5_historical_r1i1p1f1_gn.nc");

    // Two requests for tas were merged into a single 2000-2001 excerpt
    let tas = open_dataset(&output.join(&tas_rel))?;
    assert_eq!(tas.dim_len("time"), Some(24));
    assert_eq!(tas.dim_len("lat"), Some(10));
    assert_eq!(tas.dim_len("lon"), Some(10));

    let area = open_dataset(&output.join(&area_rel))?;
    assert_eq!(area.dim_len("lat"), Some(10));
    assert!(!area.has_dim("time"));

    assert_eq!(
        registry_paths(&registry),
        vec![
            tas_rel.to_string_lossy().replace('\\', "/"),
            area_rel.to_string_lossy().replace('\\', "/"),
        ]
    );
    Ok(())
}

#[test]
fn test_pipeline_rerun_is_idempotent() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let catalog = corpus_catalog(&temp_dir.path().join("cache"))?;
    let output = temp_dir.path().join("data");
    let registry = temp_dir.path().join("registry.txt");
    let pipeline = Pipeline::new(&catalog, &output, &registry);

    let first = pipeline.run(&corpus_configs())?;
    let first_registry = fs::read_to_string(&registry)?;

    let second = pipeline.run(&corpus_configs())?;
    assert_eq!(first, second);
    // Same paths and same checksums: the rewritten files are byte-identical
    assert_eq!(fs::read_to_string(&registry)?, first_registry);
    assert_eq!(registry_lines(&registry).len(), 2);
    Ok(())
}

#[test]
fn test_pipeline_stops_on_unsupported_grid() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let cache = temp_dir.path().join("cache");
    fs::create_dir_all(&cache)?;

    let path = cache.join("sftlf_fx_ACCESS-ESM1-5_historical_r1i1p1f1_gn.nc");
    {
        let mut file = create(&path)?;
        file.add_dimension("x", 3)?;
        file.add_dimension("y", 3)?;
        let mut var = file.add_variable::<f32>("sftlf", &["y", "x"])?;
        var.put_values(&[0.0f32; 9], ..)?;
    }

    let mut catalog = StaticCatalog::default();
    catalog.add(cmip6_entry("sftlf", "fx", "historical", "r1i1p1f1"), vec![path]);

    let output = temp_dir.path().join("data");
    let pipeline = Pipeline::new(&catalog, &output, &temp_dir.path().join("registry.txt"));
    let result = pipeline.run(&[SearchConfig::new().facet("variable_id", "sftlf")]);

    assert_matches!(result, Err(FetchError::UnsupportedGrid { dims }) if dims == vec!["x", "y"]);
    Ok(())
}
