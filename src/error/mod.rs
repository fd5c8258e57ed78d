//! Error handling for the analysis pipeline.
//!
//! Statistical shortfalls (too few observations, zero variance, a model that
//! will not converge) are not errors: they degrade into notices or empty
//! results. The variants here cover broken input contracts, invalid
//! configuration and I/O.

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Error type for the region audit crate
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error converting between Rust values and Arrow arrays
    #[error("Arrow serialization error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    /// Error reading or writing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is missing from an input table
    #[error("Column '{column}' not found in {dataset} data")]
    ColumnNotFound {
        /// Dataset the column was expected in
        dataset: String,
        /// Name of the missing column
        column: String,
    },

    /// A column exists but cannot be read as the expected type
    #[error("Column '{column}' in {dataset} data has unsupported type {data_type}")]
    ColumnType {
        /// Dataset holding the column
        dataset: String,
        /// Name of the offending column
        column: String,
        /// Arrow type found
        data_type: String,
    },

    /// Configuration value outside its valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An algorithm was called with fewer observations than it needs
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

impl AnalysisError {
    /// Shorthand for an [`AnalysisError::InvalidConfig`]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Shorthand for an [`AnalysisError::InsufficientData`]
    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientData(message.into())
    }
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
