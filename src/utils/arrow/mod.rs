//! Arrow helpers for column lookup and typed extraction

pub mod array_utils;
pub mod extractors;

pub use array_utils::{coerce_column, downcast_array, get_column, is_numeric};
pub use extractors::{DateColumn, date_values, numeric_values, string_values};
