//! Statistical auditing of regional biometric, demographic and enrollment
//! records.
//!
//! Raw tables are converted into typed records, aggregated into one metric
//! row per region and run through a set of detectors: univariate outliers,
//! ratio rules, an isolation forest, k-means clustering and an ARIMA trend
//! forecast, plus quality, growth, spatial and demographic checks. Every
//! detector contributes findings to a single report.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod models;
pub mod utils;

pub use algorithm::{AnalysisReport, Analyzer};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use loader::{load_data_dir, load_table};
pub use models::{DatasetKind, Finding, MetricTable, Notice, RawTable};

pub use arrow::record_batch::RecordBatch;
