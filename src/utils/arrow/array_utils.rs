//! Utilities for working with Arrow arrays.
//!
//! Column lookup and type coercion with errors that name the dataset and
//! column involved.

use arrow::array::{Array, ArrayRef};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{AnalysisError, Result};

/// Get a column from a record batch by name
///
/// # Arguments
///
/// * `batch` - The record batch containing the column
/// * `dataset` - Dataset label used in error messages
/// * `column_name` - The name of the column to extract
/// * `required` - Whether a missing column is an error
///
/// # Returns
///
/// * `Ok(Some(ArrayRef))` - The column if found
/// * `Ok(None)` - If the column is not found and `required` is false
/// * `Err(AnalysisError::ColumnNotFound)` - If the column is required but missing
pub fn get_column(
    batch: &RecordBatch,
    dataset: &str,
    column_name: &str,
    required: bool,
) -> Result<Option<ArrayRef>> {
    match batch.schema().index_of(column_name) {
        Ok(idx) => Ok(Some(batch.column(idx).clone())),
        Err(_) if required => Err(AnalysisError::ColumnNotFound {
            dataset: dataset.to_string(),
            column: column_name.to_string(),
        }),
        Err(_) => {
            debug!("Optional column '{column_name}' not present in {dataset} data");
            Ok(None)
        }
    }
}

/// Cast a column to `target`, returning it unchanged when it already matches
///
/// Values that cannot be represented in the target type become nulls.
pub fn coerce_column(
    array: &ArrayRef,
    dataset: &str,
    column_name: &str,
    target: &DataType,
) -> Result<ArrayRef> {
    let actual = array.data_type();
    if actual == target {
        return Ok(array.clone());
    }
    debug!("Converting {dataset} column '{column_name}' from {actual:?} to {target:?}");
    cast(array, target).map_err(|_| AnalysisError::ColumnType {
        dataset: dataset.to_string(),
        column: column_name.to_string(),
        data_type: format!("{actual:?}"),
    })
}

/// Downcast a column to a concrete array type
pub fn downcast_array<'a, T: Array + 'static>(
    array: &'a ArrayRef,
    dataset: &str,
    column_name: &str,
) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| AnalysisError::ColumnType {
            dataset: dataset.to_string(),
            column: column_name.to_string(),
            data_type: format!("{:?}", array.data_type()),
        })
}

/// Whether an Arrow type holds numbers
#[must_use]
pub fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _)
    )
}
