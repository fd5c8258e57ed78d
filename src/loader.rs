//! Parquet loading for the three regional datasets
//!
//! A data directory holds one subdirectory per dataset kind
//! (`biometric/`, `demographic/`, `enrollment/`), each with any number of
//! Parquet files. Files are read in parallel and their batches kept in file
//! name order so repeated runs see the same row order.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rayon::prelude::*;

use crate::error::{AnalysisError, Result};
use crate::models::{DatasetKind, RawTable};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Batch size from `PARQUET_BATCH_SIZE`, if set and valid
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Validates that a directory exists and is a directory
///
/// # Errors
/// Returns an error if the path is missing or not a directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(AnalysisError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory does not exist: {}", dir.display()),
        )));
    }
    Ok(())
}

/// Read a parquet file into Arrow record batches
///
/// # Errors
/// Returns an error if the file cannot be opened or is not valid Parquet
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    let start = Instant::now();
    let file = File::open(path).map_err(|e| {
        AnalysisError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open file {}: {e}", path.display()),
        ))
    })?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE))
        .build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    log::debug!(
        "Read {} batches from {} in {:?}",
        batches.len(),
        path.display(),
        start.elapsed()
    );
    Ok(batches)
}

/// Find all Parquet files in a directory, sorted by file name
///
/// # Errors
/// Returns an error if the directory cannot be read
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    validate_directory(dir)?;

    let parquet_files = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .filter_ok(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "parquet"))
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .sorted()
        .collect_vec();

    if parquet_files.is_empty() {
        log::warn!("No Parquet files found in directory: {}", dir.display());
    } else {
        log::info!(
            "Found {} parquet files in {}",
            parquet_files.len(),
            dir.display()
        );
    }
    Ok(parquet_files)
}

/// Load every Parquet file of one dataset directory in parallel
///
/// # Errors
/// Returns the first read error encountered
pub fn load_table(dir: &Path, kind: DatasetKind) -> Result<RawTable> {
    let start = Instant::now();
    let files = find_parquet_files(dir)?;

    let per_file: Vec<Vec<RecordBatch>> = files
        .par_iter()
        .map(|path| read_parquet(path))
        .collect::<Result<_>>()?;
    let table = RawTable::new(kind, per_file.into_iter().flatten().collect());

    log::info!(
        "Loaded {} {kind} rows from {} files in {:?}",
        table.num_rows(),
        files.len(),
        start.elapsed()
    );
    Ok(table)
}

/// Load every dataset found under a data directory
///
/// Kinds without a subdirectory are skipped with a warning.
///
/// # Errors
/// Returns an error if the root is not a directory or a file cannot be read
pub fn load_data_dir(root: &Path) -> Result<Vec<RawTable>> {
    validate_directory(root)?;
    let mut tables = Vec::new();
    for kind in DatasetKind::ALL {
        let dir = root.join(kind.name());
        if dir.is_dir() {
            tables.push(load_table(&dir, kind)?);
        } else {
            log::warn!("No {kind} directory under {}", root.display());
        }
    }
    Ok(tables)
}
