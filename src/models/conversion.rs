//! Conversion from loaded record batches to typed datasets

use log::{debug, warn};
use smallvec::SmallVec;

use crate::config::ColumnConfig;
use crate::error::Result;
use crate::models::dataset::{Dataset, RawRecord, RawTable};
use crate::utils::arrow::{date_values, get_column, numeric_values, string_values};

/// Convert a raw table into typed records
///
/// Rows with a null or empty region are dropped and counted. Null category
/// counts become zero; negative counts are kept as-is. Dates that fail to
/// parse become `None` and are counted.
///
/// # Arguments
/// * `table` - Loaded batches of one dataset kind
/// * `columns` - Names of the shared columns and accepted date formats
///
/// # Returns
/// The converted dataset
///
/// # Errors
/// Returns an error if the region column or a count column is missing, or a
/// column has a type that cannot be coerced
pub fn convert_table(table: &RawTable, columns: &ColumnConfig) -> Result<Dataset> {
    let kind = table.kind;
    let dataset = kind.name();
    let mut records = Vec::with_capacity(table.num_rows());
    let mut skipped_rows = 0;
    let mut unparseable_dates = 0;

    for batch in &table.batches {
        let regions = match get_column(batch, dataset, &columns.region, true)? {
            Some(array) => string_values(&array, dataset, &columns.region)?,
            None => continue,
        };
        let sub_regions = match get_column(batch, dataset, &columns.sub_region, false)? {
            Some(array) => string_values(&array, dataset, &columns.sub_region)?,
            None => vec![None; batch.num_rows()],
        };
        let dates = match get_column(batch, dataset, &columns.date, false)? {
            Some(array) => date_values(&array, dataset, &columns.date, &columns.date_formats)?,
            None => {
                warn!("No '{}' column in {dataset} data; time analyses will be empty", columns.date);
                Default::default()
            }
        };
        unparseable_dates += dates.unparseable;

        let counts = kind
            .count_columns()
            .iter()
            .map(|name| {
                get_column(batch, dataset, name, true)?
                    .map_or_else(|| Ok(vec![None; batch.num_rows()]), |a| numeric_values(&a, dataset, name))
            })
            .collect::<Result<Vec<_>>>()?;

        for (row, region) in regions.into_iter().enumerate() {
            let Some(region) = region else {
                skipped_rows += 1;
                continue;
            };
            records.push(RawRecord {
                region,
                sub_region: sub_regions[row].clone(),
                date: dates.values.get(row).copied().flatten(),
                counts: counts
                    .iter()
                    .map(|column| column[row].unwrap_or(0.0))
                    .collect::<SmallVec<[f64; 3]>>(),
            });
        }
    }

    debug!(
        "Converted {} {dataset} rows ({skipped_rows} without region, {unparseable_dates} bad dates)",
        records.len()
    );

    Ok(Dataset {
        kind,
        records,
        skipped_rows,
        unparseable_dates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::models::dataset::DatasetKind;
    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn bio_batch() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            (
                "state",
                Arc::new(StringArray::from(vec![Some("A"), None, Some("B")])) as ArrayRef,
            ),
            (
                "date",
                Arc::new(StringArray::from(vec!["01-03-2025", "02-03-2025", "bad"])) as ArrayRef,
            ),
            (
                "bio_age_5_17",
                Arc::new(Int64Array::from(vec![Some(5), Some(1), None])) as ArrayRef,
            ),
            (
                "bio_age_17_",
                Arc::new(Float64Array::from(vec![10.0, 2.0, -3.0])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_convert_skips_missing_regions_and_fills_nulls() {
        let table = RawTable::new(DatasetKind::Biometric, vec![bio_batch()]);
        let dataset = convert_table(&table, &ColumnConfig::default()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.skipped_rows, 1);
        assert_eq!(dataset.unparseable_dates, 1);
        assert_eq!(dataset.records[0].total(), 15.0);
        assert_eq!(dataset.records[0].sub_region, None);
        assert_eq!(dataset.records[1].counts.as_slice(), &[0.0, -3.0]);
        assert_eq!(dataset.records[1].date, None);
    }

    #[test]
    fn test_convert_missing_count_column() {
        let table = RawTable::new(DatasetKind::Demographic, vec![bio_batch()]);
        let err = convert_table(&table, &ColumnConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::ColumnNotFound { column, .. } if column == "demo_age_5_17"));
    }
}
