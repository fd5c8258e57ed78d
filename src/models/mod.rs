//! Domain models for the regional analysis
//!
//! Raw input tables and their typed records, the region metric table the
//! detectors consume, calendar periods and the findings a run produces.

pub mod conversion;
pub mod dataset;
pub mod finding;
pub mod metrics;
pub mod period;

pub use conversion::convert_table;
pub use dataset::{Dataset, DatasetKind, RawRecord, RawTable};
pub use finding::{Finding, FindingCategory, Notice, Severity, Stage};
pub use metrics::{CategoryStats, Metric, MetricTable, RegionMetrics};
pub use period::YearMonth;
