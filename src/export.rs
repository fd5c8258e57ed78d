//! Report export
//!
//! The region metric table and the findings are flattened into serde rows
//! and converted to Arrow with `serde_arrow`, so they can be written as
//! Parquet next to the JSON report.

use std::fs::File;
use std::path::Path;

use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::algorithm::AnalysisReport;
use crate::error::Result;
use crate::models::{DatasetKind, Finding, Metric, MetricTable};

/// One region of the metric table in flat form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub region: String,
    pub bio_youth: f64,
    pub bio_adult: f64,
    pub demo_youth: f64,
    pub demo_adult: f64,
    pub enroll_child: f64,
    pub enroll_youth: f64,
    pub enroll_adult: f64,
    pub total_bio: f64,
    pub total_demo: f64,
    pub total_enroll: f64,
    pub bio_demo_ratio: f64,
    pub bio_enroll_ratio: f64,
    pub demo_enroll_ratio: f64,
    pub update_enroll_ratio: f64,
    pub bio_rows: u64,
    pub demo_rows: u64,
    pub enroll_rows: u64,
}

/// One finding in flat form; regions and values are joined with `;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingRow {
    pub stage: String,
    pub category: String,
    pub severity: String,
    pub detector: String,
    pub description: String,
    pub regions: String,
    pub values: String,
}

/// Flatten the metric table
#[must_use]
pub fn metric_rows(table: &MetricTable) -> Vec<MetricRow> {
    table
        .rows()
        .iter()
        .map(|row| MetricRow {
            region: row.region.clone(),
            bio_youth: row.value(Metric::BioYouth),
            bio_adult: row.value(Metric::BioAdult),
            demo_youth: row.value(Metric::DemoYouth),
            demo_adult: row.value(Metric::DemoAdult),
            enroll_child: row.value(Metric::EnrollChild),
            enroll_youth: row.value(Metric::EnrollYouth),
            enroll_adult: row.value(Metric::EnrollAdult),
            total_bio: row.total_bio,
            total_demo: row.total_demo,
            total_enroll: row.total_enroll,
            bio_demo_ratio: row.bio_demo_ratio,
            bio_enroll_ratio: row.bio_enroll_ratio,
            demo_enroll_ratio: row.demo_enroll_ratio,
            update_enroll_ratio: row.update_enroll_ratio,
            bio_rows: row.row_counts[DatasetKind::Biometric.index()] as u64,
            demo_rows: row.row_counts[DatasetKind::Demographic.index()] as u64,
            enroll_rows: row.row_counts[DatasetKind::Enrollment.index()] as u64,
        })
        .collect()
}

/// Flatten findings
#[must_use]
pub fn finding_rows(findings: &[Finding]) -> Vec<FindingRow> {
    findings
        .iter()
        .map(|f| FindingRow {
            stage: f.stage().to_string(),
            category: format!("{:?}", f.category()),
            severity: format!("{:?}", f.severity()),
            detector: f.detector().to_string(),
            description: f.description().to_string(),
            regions: f.regions().join(";"),
            values: f.values().iter().map(|v| format!("{v}")).join(";"),
        })
        .collect()
}

fn rows_to_batch<T: Serialize + for<'de> Deserialize<'de>>(rows: &[T]) -> Result<RecordBatch> {
    let fields = Vec::<FieldRef>::from_type::<T>(TracingOptions::default())?;
    Ok(serde_arrow::to_record_batch(&fields, &rows)?)
}

/// Metric table as a record batch
///
/// # Errors
/// Returns an error if the rows cannot be converted to Arrow
pub fn metrics_to_batch(table: &MetricTable) -> Result<RecordBatch> {
    rows_to_batch(&metric_rows(table))
}

/// Findings as a record batch
///
/// # Errors
/// Returns an error if the rows cannot be converted to Arrow
pub fn findings_to_batch(findings: &[Finding]) -> Result<RecordBatch> {
    rows_to_batch(&finding_rows(findings))
}

/// Read metric rows back from a record batch
///
/// # Errors
/// Returns an error if the batch does not have the metric row layout
pub fn metric_rows_from_batch(batch: &RecordBatch) -> Result<Vec<MetricRow>> {
    Ok(serde_arrow::from_record_batch(batch)?)
}

/// Write one record batch to a Parquet file
///
/// # Errors
/// Returns an error if the file cannot be created or written
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    log::info!("Wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}

/// Full report as pretty-printed JSON
///
/// # Errors
/// Returns an error if serialization fails
pub fn report_to_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write the JSON report and the metric and findings tables to a directory
///
/// # Errors
/// Returns an error if the directory cannot be created or a file fails to write
pub fn write_report(dir: &Path, report: &AnalysisReport) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join("report.json"), report_to_json(report)?)?;
    write_parquet(&dir.join("region_metrics.parquet"), &metrics_to_batch(&report.metrics)?)?;
    write_parquet(&dir.join("findings.parquet"), &findings_to_batch(&report.findings)?)?;
    Ok(())
}
