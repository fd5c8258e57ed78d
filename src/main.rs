use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use log::{info, warn};
use region_audit::export::write_report;
use region_audit::{AnalysisConfig, Analyzer, load_data_dir};

const USAGE: &str = "usage: region-audit <data-dir> [config.json] [output-dir]";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(data_dir) = args.first().map(PathBuf::from) else {
        bail!(USAGE);
    };
    let config = match args.get(1) {
        Some(path) => AnalysisConfig::from_json_file(Path::new(path))
            .with_context(|| format!("Failed to load configuration from {path}"))?,
        None => AnalysisConfig::default(),
    };
    let output_dir = args
        .get(2)
        .map_or_else(|| PathBuf::from("audit_output"), PathBuf::from);

    let threads = num_cpus::get();
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("Failed to configure thread pool")?;
    info!("Using {threads} worker threads");

    let start = Instant::now();
    info!("Loading data from: {}", data_dir.display());
    let tables = load_data_dir(&data_dir)
        .with_context(|| format!("Failed to load data from {}", data_dir.display()))?;
    if tables.is_empty() {
        warn!("No dataset directories found under {}", data_dir.display());
    }

    let report = Analyzer::new(config).run(&tables).context("Analysis failed")?;
    write_report(&output_dir, &report)
        .with_context(|| format!("Failed to write report to {}", output_dir.display()))?;

    println!("{}", report.summary());
    info!(
        "Finished in {:?}; report written to {}",
        start.elapsed(),
        output_dir.display()
    );
    Ok(())
}
