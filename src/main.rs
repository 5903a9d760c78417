//! Entry point for fetch-test-data.
//! Parses the CLI, sets up logging, and runs the corpus pipeline against ESGF.

use clap::Parser;
mod cli;
mod logging;

use cli::Args;
use cmip_testdata::catalog::EsgfCatalog;
use cmip_testdata::config::{default_configs, load_configs};
use cmip_testdata::pipeline::Pipeline;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let configs = match &args.queries {
        Some(path) => load_configs(path)?,
        None => default_configs(),
    };

    let cache_dir = match args.cache_dir {
        Some(dir) => dir,
        None => EsgfCatalog::default_cache_dir()?,
    };
    let catalog = EsgfCatalog::new(&args.index_node, cache_dir)?;

    let pipeline = Pipeline::new(&catalog, &args.output, &args.registry);
    let summary = pipeline.run(&configs)?;

    println!(
        "✅ {} datasets, {} files written, {} skipped (no data in range), {} registry entries",
        summary.datasets, summary.files_written, summary.files_skipped, summary.registry_entries
    );
    println!("Registry saved to {}", args.registry.display());

    Ok(())
}
