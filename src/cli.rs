//! Defines command-line interface options using `clap` for fetch-test-data.

use clap::Parser;
use std::path::PathBuf;

use cmip_testdata::catalog::DEFAULT_INDEX_NODE;

/// Fetch and decimate the reference test-data corpus from ESGF
#[derive(Parser, Debug)]
#[command(
    name = "fetch-test-data",
    version,
    about = "Fetch, decimate and register the reference test-data corpus"
)]
pub struct Args {
    /// Root directory of the written corpus
    #[arg(short, long, default_value = "data")]
    pub output: PathBuf,

    /// Path of the checksum registry
    #[arg(long, default_value = "registry.txt")]
    pub registry: PathBuf,

    /// JSON file with search configurations replacing the built-in corpus queries
    #[arg(long)]
    pub queries: Option<PathBuf>,

    /// ESGF esg-search endpoint
    #[arg(long, default_value = DEFAULT_INDEX_NODE)]
    pub index_node: String,

    /// Download cache. Defaults to ~/.esgf
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
