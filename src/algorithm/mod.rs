//! Analysis algorithms
//!
//! Aggregation, statistical detectors, forecasting and the pipeline that
//! runs them over a set of regional tables.

pub mod aggregation;
pub mod anomaly;
pub mod clustering;
pub mod control_chart;
pub mod correlation;
pub mod demographic;
pub mod findings;
pub mod growth;
pub mod network;
pub mod outliers;
pub mod pipeline;
pub mod quality;
pub mod ratio;
pub mod spatial;
pub mod timeseries;

pub use pipeline::{AnalysisReport, Analyzer};
