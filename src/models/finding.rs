//! Findings produced by an analysis run

use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad class of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    /// Input data quality problem
    Quality,
    /// Statistical or model-based anomaly
    Anomaly,
    /// Implausible ratio between datasets
    Ratio,
    /// Unusual distribution across age bands
    Distribution,
    /// Regional or spatial pattern
    Geographic,
}

/// How urgent a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational
    Low,
    /// Worth a look
    Medium,
    /// Likely a real problem
    High,
}

/// Analysis stage a finding was raised in; the declaration order is the
/// order findings are reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Input quality checks
    Quality,
    /// Growth patterns and forecasting
    Trend,
    /// Univariate and multivariate outliers
    Anomaly,
    /// Cross-dataset ratios
    Ratio,
    /// Spatial comparison, hotspots and clustering
    Spatial,
    /// Age-band segmentation
    Demographic,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Quality => "quality",
            Self::Trend => "trend",
            Self::Anomaly => "anomaly",
            Self::Ratio => "ratio",
            Self::Spatial => "spatial",
            Self::Demographic => "demographic",
        };
        f.write_str(label)
    }
}

/// An immutable problem statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    category: FindingCategory,
    severity: Severity,
    stage: Stage,
    detector: String,
    description: String,
    regions: Vec<String>,
    values: Vec<f64>,
}

impl Finding {
    /// Create a finding without region details
    pub fn new(
        category: FindingCategory,
        severity: Severity,
        stage: Stage,
        detector: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            stage,
            detector: detector.into(),
            description: description.into(),
            regions: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Attach the offending regions and their metric values
    #[must_use]
    pub fn with_regions(mut self, regions: Vec<String>, values: Vec<f64>) -> Self {
        self.regions = regions;
        self.values = values;
        self
    }

    /// Finding category
    #[must_use]
    pub fn category(&self) -> FindingCategory {
        self.category
    }

    /// Severity
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Stage that raised the finding
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Name of the detector that raised the finding
    #[must_use]
    pub fn detector(&self) -> &str {
        &self.detector
    }

    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Offending regions, if any
    #[must_use]
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// Metric values matching [`Finding::regions`]
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.description)
    }
}

/// A sub-analysis that produced no result, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Stage the notice belongs to
    pub stage: Stage,
    /// Reason the sub-analysis was skipped
    pub message: String,
}

impl Notice {
    /// Create a notice
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}
