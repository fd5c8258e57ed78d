//! Univariate outlier detection over the region metric table
//!
//! Two independent detectors share the [`UnivariateDetector`] trait: a
//! Z-score detector assuming a roughly normal distribution and an IQR
//! detector that makes no distributional assumption. A degenerate
//! distribution (zero spread) suppresses a detector's output.

pub mod iqr;
pub mod zscore;

use serde::{Deserialize, Serialize};

use crate::models::{Metric, MetricTable};

pub use iqr::IqrDetector;
pub use zscore::ZScoreDetector;

/// One value flagged by a detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outlier {
    /// Position in the input slice
    pub index: usize,
    /// Flagged value
    pub value: f64,
    /// Detector-specific distance from normal (|z| or fence distance in IQRs)
    pub score: f64,
}

/// Bounds and flags from one detector pass
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Values below this are outliers
    pub lower: f64,
    /// Values above this are outliers
    pub upper: f64,
    /// Flagged values in input order
    pub outliers: Vec<Outlier>,
}

/// A flagged region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionOutlier {
    /// Region identifier
    pub region: String,
    /// Metric value
    pub value: f64,
    /// Detector-specific score
    pub score: f64,
}

/// Result of running one detector over one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    /// Detector name
    pub detector: String,
    /// Metric examined
    pub metric: Metric,
    /// Normal range; `None` when the distribution was degenerate
    pub bounds: Option<(f64, f64)>,
    /// Flagged regions in table order
    pub outliers: Vec<RegionOutlier>,
}

impl OutlierReport {
    /// Whether the detector suppressed its output
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.bounds.is_none()
    }
}

/// A detector that flags extreme values in a single distribution
pub trait UnivariateDetector {
    /// Short detector name used in findings
    fn name(&self) -> &'static str;

    /// Flag values in `values`
    ///
    /// Returns `None` when the distribution is degenerate and nothing can be
    /// said about it.
    fn detect(&self, values: &[f64]) -> Option<Detection>;

    /// Run the detector over one column of the metric table
    fn detect_metric(&self, table: &MetricTable, metric: Metric) -> OutlierReport {
        let values = table.column(metric);
        let detection = self.detect(&values);
        let rows = table.rows();
        OutlierReport {
            detector: self.name().to_string(),
            metric,
            bounds: detection.as_ref().map(|d| (d.lower, d.upper)),
            outliers: detection
                .map(|d| {
                    d.outliers
                        .into_iter()
                        .map(|o| RegionOutlier {
                            region: rows[o.index].region.clone(),
                            value: o.value,
                            score: o.score,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
