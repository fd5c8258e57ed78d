//! Column extraction utilities for Arrow record batches
//!
//! Each extractor reads a whole column into a `Vec` of optional values,
//! coercing compatible Arrow types first.

use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::DataType;
use chrono::NaiveDate;

use crate::error::{AnalysisError, Result};
use crate::utils::arrow::array_utils::{coerce_column, downcast_array, is_numeric};
use crate::utils::date::parse_date_string;

/// Read a numeric column as `f64`
///
/// Integer, float and decimal columns are widened; numeric text is parsed.
/// Nulls and unparseable values come back as `None`.
pub fn numeric_values(array: &ArrayRef, dataset: &str, column: &str) -> Result<Vec<Option<f64>>> {
    let data_type = array.data_type();
    if !is_numeric(data_type) && !matches!(data_type, DataType::Utf8 | DataType::LargeUtf8) {
        return Err(AnalysisError::ColumnType {
            dataset: dataset.to_string(),
            column: column.to_string(),
            data_type: format!("{data_type:?}"),
        });
    }
    let coerced = coerce_column(array, dataset, column, &DataType::Float64)?;
    let values = downcast_array::<Float64Array>(&coerced, dataset, column)?;
    Ok(values.iter().collect())
}

/// Read a column as strings; empty strings count as missing
pub fn string_values(array: &ArrayRef, dataset: &str, column: &str) -> Result<Vec<Option<String>>> {
    let coerced = coerce_column(array, dataset, column, &DataType::Utf8)?;
    let values = downcast_array::<StringArray>(&coerced, dataset, column)?;
    Ok(values
        .iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect())
}

/// Dates read from a column, plus how many non-null values failed to parse
#[derive(Debug, Clone, Default)]
pub struct DateColumn {
    /// Parsed dates, `None` for missing or unparseable
    pub values: Vec<Option<NaiveDate>>,
    /// Non-null cells that could not be parsed
    pub unparseable: usize,
}

/// Read a date column
///
/// Text columns are parsed with `formats`; Arrow date and timestamp columns
/// are converted directly.
pub fn date_values<S: AsRef<str>>(
    array: &ArrayRef,
    dataset: &str,
    column: &str,
    formats: &[S],
) -> Result<DateColumn> {
    match array.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            let coerced = coerce_column(array, dataset, column, &DataType::Utf8)?;
            let strings = downcast_array::<StringArray>(&coerced, dataset, column)?;
            let mut unparseable = 0;
            let values = strings
                .iter()
                .map(|cell| {
                    let cell = cell?;
                    let parsed = parse_date_string(cell, formats);
                    if parsed.is_none() {
                        unparseable += 1;
                    }
                    parsed
                })
                .collect();
            Ok(DateColumn {
                values,
                unparseable,
            })
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let coerced = coerce_column(array, dataset, column, &DataType::Date32)?;
            let dates = downcast_array::<Date32Array>(&coerced, dataset, column)?;
            let values = (0..dates.len())
                .map(|i| {
                    if dates.is_null(i) {
                        None
                    } else {
                        dates.value_as_date(i)
                    }
                })
                .collect();
            Ok(DateColumn {
                values,
                unparseable: 0,
            })
        }
        other => Err(AnalysisError::ColumnType {
            dataset: dataset.to_string(),
            column: column.to_string(),
            data_type: format!("{other:?}"),
        }),
    }
}
