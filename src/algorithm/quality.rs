//! Input data quality profiling
//!
//! Counts the problems that would silently distort the aggregates: null
//! cells, exact duplicate rows, negative counts and dates that could not be
//! parsed. Nothing is repaired here; the counts become findings.

use std::collections::BTreeMap;
use std::collections::hash_map::Entry;

use arrow::array::{Array, Float64Array};
use arrow::datatypes::DataType;
use arrow::row::{OwnedRow, RowConverter, SortField};
use chrono::NaiveDate;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Dataset, DatasetKind, Finding, FindingCategory, RawTable, Severity, Stage};
use crate::utils::arrow::{coerce_column, downcast_array, is_numeric};

const DETECTOR: &str = "quality_profile";

/// Quality counts for one input table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    /// Dataset kind
    pub dataset: DatasetKind,
    /// Rows in the raw table
    pub rows: usize,
    /// Null cells over all columns
    pub null_cells: usize,
    /// Rows identical to an earlier row
    pub duplicate_rows: usize,
    /// Negative values per numeric column
    pub negative_values: BTreeMap<String, usize>,
    /// Present but unparseable dates
    pub unparseable_dates: usize,
    /// Rows dropped for a missing region
    pub missing_regions: usize,
    /// Distinct regions
    pub unique_regions: usize,
    /// First and last parsed date
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Profile one raw table and its converted records
///
/// # Errors
/// Returns an error if a numeric column cannot be cast or row encoding fails
pub fn profile_table(table: &RawTable, dataset: &Dataset) -> Result<QualityProfile> {
    let label = table.kind.name();
    let mut null_cells = 0;
    let mut negative_values: BTreeMap<String, usize> = BTreeMap::new();
    let mut seen: FxHashMap<Vec<DataType>, (RowConverter, FxHashSet<OwnedRow>)> = FxHashMap::default();
    let mut duplicate_rows = 0;

    for batch in &table.batches {
        let schema = batch.schema();
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            null_cells += column.null_count();
            if is_numeric(field.data_type()) {
                let values = coerce_column(column, label, field.name(), &DataType::Float64)?;
                let values = downcast_array::<Float64Array>(&values, label, field.name())?;
                let negatives = values.iter().flatten().filter(|v| *v < 0.0).count();
                *negative_values.entry(field.name().clone()).or_insert(0) += negatives;
            }
        }

        let types: Vec<DataType> = schema.fields().iter().map(|f| f.data_type().clone()).collect();
        let sort_fields: Vec<SortField> = types.iter().cloned().map(SortField::new).collect();
        if !RowConverter::supports_fields(&sort_fields) {
            debug!("Skipping duplicate check for a {label} batch with unsupported column types");
            continue;
        }
        let (converter, rows_seen) = match seen.entry(types) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                e.insert((RowConverter::new(sort_fields)?, FxHashSet::default()))
            }
        };
        let rows = converter.convert_columns(batch.columns())?;
        for row in rows.iter() {
            if !rows_seen.insert(row.owned()) {
                duplicate_rows += 1;
            }
        }
    }
    negative_values.retain(|_, count| *count > 0);

    let unique_regions = dataset
        .records
        .iter()
        .map(|r| r.region.as_str())
        .collect::<FxHashSet<_>>()
        .len();
    let dates = dataset.records.iter().filter_map(|r| r.date);
    let date_range = dates.clone().min().zip(dates.max());

    Ok(QualityProfile {
        dataset: table.kind,
        rows: table.num_rows(),
        null_cells,
        duplicate_rows,
        negative_values,
        unparseable_dates: dataset.unparseable_dates,
        missing_regions: dataset.skipped_rows,
        unique_regions,
        date_range,
    })
}

impl QualityProfile {
    /// Findings for every non-zero problem count
    #[must_use]
    pub fn to_findings(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        let name = self.dataset.name();
        let finding = |severity: Severity, description: String| {
            Finding::new(FindingCategory::Quality, severity, Stage::Quality, DETECTOR, description)
        };

        for (column, count) in &self.negative_values {
            findings.push(finding(
                Severity::High,
                format!("{name}: {count} negative values in column '{column}'"),
            ));
        }
        if self.duplicate_rows > 0 {
            findings.push(finding(
                Severity::Medium,
                format!("{name}: {} duplicate rows", self.duplicate_rows),
            ));
        }
        if self.null_cells > 0 {
            findings.push(finding(
                Severity::Low,
                format!("{name}: {} null cells", self.null_cells),
            ));
        }
        if self.missing_regions > 0 {
            findings.push(finding(
                Severity::Medium,
                format!("{name}: {} rows without a region were dropped", self.missing_regions),
            ));
        }
        if self.unparseable_dates > 0 {
            findings.push(finding(
                Severity::Medium,
                format!("{name}: {} dates could not be parsed", self.unparseable_dates),
            ));
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;
    use crate::models::convert_table;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn demo_table() -> RawTable {
        let batch = RecordBatch::try_from_iter(vec![
            (
                "state",
                Arc::new(StringArray::from(vec![Some("A"), Some("A"), Some("B"), None])) as ArrayRef,
            ),
            (
                "date",
                Arc::new(StringArray::from(vec!["01-01-2025", "01-01-2025", "05-02-2025", "x"])) as ArrayRef,
            ),
            (
                "demo_age_5_17",
                Arc::new(Int64Array::from(vec![Some(1), Some(1), Some(-4), None])) as ArrayRef,
            ),
            (
                "demo_age_17_",
                Arc::new(Int64Array::from(vec![2, 2, 3, 4])) as ArrayRef,
            ),
        ])
        .unwrap();
        RawTable::new(DatasetKind::Demographic, vec![batch])
    }

    #[test]
    fn test_profile_counts() {
        let table = demo_table();
        let dataset = convert_table(&table, &ColumnConfig::default()).unwrap();
        let profile = profile_table(&table, &dataset).unwrap();

        assert_eq!(profile.rows, 4);
        assert_eq!(profile.null_cells, 2);
        assert_eq!(profile.duplicate_rows, 1);
        assert_eq!(profile.negative_values.get("demo_age_5_17"), Some(&1));
        assert!(!profile.negative_values.contains_key("demo_age_17_"));
        assert_eq!(profile.missing_regions, 1);
        assert_eq!(profile.unique_regions, 2);
        assert_eq!(
            profile.date_range,
            Some((
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 2, 5).unwrap()
            ))
        );

        let findings = profile.to_findings();
        assert_eq!(profile.unparseable_dates, 1);
        assert_eq!(findings.len(), 5);
        assert!(findings.iter().all(|f| f.stage() == Stage::Quality));
        assert_eq!(findings[0].severity(), Severity::High);
    }
}
