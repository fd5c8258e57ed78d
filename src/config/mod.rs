//! Configuration for an analysis run.
//!
//! Every threshold used by the detectors lives here. The defaults are the
//! empirical constants the audit was first run with; they are tunable, not
//! statistically derived.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::models::dataset::DatasetKind;
use crate::models::metrics::Metric;

/// Default feature space for the anomaly scorer and the clustering engine
pub const DEFAULT_FEATURES: [Metric; 5] = [
    Metric::TotalBio,
    Metric::TotalDemo,
    Metric::TotalEnroll,
    Metric::BioDemoRatio,
    Metric::UpdateEnrollRatio,
];

/// Names of the shared input columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Region column
    pub region: String,
    /// Sub-region column
    pub sub_region: String,
    /// Date column
    pub date: String,
    /// Date formats tried in order for text dates
    pub date_formats: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            region: "state".to_string(),
            sub_region: "district".to_string(),
            date: "date".to_string(),
            date_formats: vec![
                "%d-%m-%Y".to_string(), // 15-01-2025
                "%d/%m/%Y".to_string(), // 15/01/2025
                "%Y-%m-%d".to_string(), // 2025-01-15
            ],
        }
    }
}

/// Univariate detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Absolute Z-score above which a region is flagged
    pub zscore_threshold: f64,
    /// Tukey fence multiplier
    pub iqr_multiplier: f64,
    /// Metrics screened by the Z-score detector
    pub zscore_metrics: Vec<Metric>,
    /// Metrics screened by the IQR detector
    pub iqr_metrics: Vec<Metric>,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            zscore_threshold: 2.0,
            iqr_multiplier: 1.5,
            zscore_metrics: vec![Metric::TotalBio, Metric::TotalDemo],
            iqr_metrics: vec![Metric::TotalBio, Metric::TotalDemo],
        }
    }
}

/// Ratio thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioConfig {
    /// Update-to-enrollment ratio above which a region is flagged
    pub max_update_enroll: f64,
    /// Lower bound for the biometric-to-demographic ratio
    pub min_bio_demo: f64,
    /// Upper bound for the biometric-to-demographic ratio
    pub max_bio_demo: f64,
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            max_update_enroll: 2.0,
            min_bio_demo: 0.2,
            max_bio_demo: 5.0,
        }
    }
}

/// Isolation forest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Features scored
    pub features: Vec<Metric>,
    /// Expected fraction of anomalous regions
    pub contamination: f64,
    /// Number of isolation trees
    pub n_estimators: usize,
    /// Sample size per tree; `None` uses `min(256, regions)`
    pub max_samples: Option<usize>,
    /// Random seed
    pub seed: u64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            features: DEFAULT_FEATURES.to_vec(),
            contamination: 0.1,
            n_estimators: 100,
            max_samples: None,
            seed: 42,
        }
    }
}

/// K-means sweep settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Features clustered
    pub features: Vec<Metric>,
    /// Largest cluster count tried
    pub max_k: usize,
    /// Restarts per cluster count
    pub n_init: usize,
    /// Lloyd iterations per restart
    pub max_iter: usize,
    /// Centroid movement below which a restart has converged
    pub tolerance: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            features: DEFAULT_FEATURES.to_vec(),
            max_k: 10,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// ARIMA forecasting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Dataset whose monthly totals are modelled
    pub dataset: DatasetKind,
    /// Fewest monthly observations accepted
    pub min_observations: usize,
    /// Periods forecast
    pub horizon: usize,
    /// Confidence level of the forecast interval
    pub confidence: f64,
    /// Stationarity test significance level
    pub significance: f64,
    /// Largest AR order searched
    pub max_p: usize,
    /// Largest differencing order searched
    pub max_d: usize,
    /// Largest MA order searched
    pub max_q: usize,
    /// Optimizer iteration cap per candidate model
    pub max_iterations: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::Biometric,
            min_observations: 10,
            horizon: 6,
            confidence: 0.95,
            significance: 0.05,
            max_p: 2,
            max_d: 1,
            max_q: 2,
            max_iterations: 2000,
        }
    }
}

/// Month-over-month growth screening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Dataset screened
    pub dataset: DatasetKind,
    /// Growth above which a month is abnormal (2.0 = +200%)
    pub max_growth: f64,
    /// Growth below which a month is abnormal (-0.5 = -50%)
    pub min_growth: f64,
    /// Cases listed in the finding
    pub report_limit: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::Biometric,
            max_growth: 2.0,
            min_growth: -0.5,
            report_limit: 10,
        }
    }
}

/// Spatial comparison and hotspot settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Fraction of regions reported as underperforming
    pub bottom_fraction: f64,
    /// Minimum number of underperforming regions reported
    pub min_underperformers: usize,
    /// Sub-region percentile rank above which it is extreme
    pub upper_percentile: f64,
    /// Sub-region percentile rank below which it is extreme
    pub lower_percentile: f64,
    /// Weight of update intensity in the resource-need score
    pub intensity_weight: f64,
    /// Weight of the update ratio in the resource-need score
    pub ratio_weight: f64,
    /// Divisor turning update counts into intensity
    pub intensity_scale: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            bottom_fraction: 0.1,
            min_underperformers: 3,
            upper_percentile: 0.95,
            lower_percentile: 0.05,
            intensity_weight: 0.6,
            ratio_weight: 0.4,
            intensity_scale: 1000.0,
        }
    }
}

/// Age-band segmentation thresholds, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicConfig {
    /// Youth share above which the distribution is unusual
    pub max_youth_share: f64,
    /// Youth share below which the distribution is unusual
    pub min_youth_share: f64,
    /// Largest acceptable gap between biometric and demographic youth shares
    pub max_pattern_gap: f64,
}

impl Default for DemographicConfig {
    fn default() -> Self {
        Self {
            max_youth_share: 80.0,
            min_youth_share: 20.0,
            max_pattern_gap: 20.0,
        }
    }
}

/// Settings for correlation, control chart and network analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    /// Absolute correlation above which a pair is strong
    pub strong_correlation: f64,
    /// Regions charted, by biometric volume
    pub control_regions: usize,
    /// Control limit width in standard deviations
    pub control_sigma: f64,
    /// Fewest daily points needed for a chart
    pub control_min_points: usize,
    /// Similarity above which two regions are linked
    pub similarity_threshold: f64,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            strong_correlation: 0.8,
            control_regions: 5,
            control_sigma: 3.0,
            control_min_points: 5,
            similarity_threshold: 0.7,
        }
    }
}

/// Configuration for a complete analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Input column names
    pub columns: ColumnConfig,
    /// Z-score and IQR detectors
    pub outliers: OutlierConfig,
    /// Ratio engine
    pub ratios: RatioConfig,
    /// Isolation forest
    pub anomaly: AnomalyConfig,
    /// K-means sweep
    pub clustering: ClusteringConfig,
    /// ARIMA forecasting
    pub trend: TrendConfig,
    /// Growth screening
    pub growth: GrowthConfig,
    /// Spatial comparison and hotspots
    pub spatial: SpatialConfig,
    /// Age-band segmentation
    pub demographic: DemographicConfig,
    /// Correlation, control charts and similarity network
    pub relations: RelationConfig,
    /// Draw progress bars for long-running steps
    pub show_progress: bool,
}

impl AnalysisConfig {
    /// Parse a configuration from JSON; missing keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that all values are in range
    pub fn validate(&self) -> Result<()> {
        let a = &self.anomaly;
        if !(0.0..=0.5).contains(&a.contamination) {
            return Err(AnalysisError::invalid_config(format!(
                "contamination must be within [0, 0.5], got {}",
                a.contamination
            )));
        }
        if a.n_estimators == 0 {
            return Err(AnalysisError::invalid_config("n_estimators must be positive"));
        }
        if a.max_samples == Some(0) {
            return Err(AnalysisError::invalid_config("max_samples must be positive"));
        }
        if a.features.is_empty() || self.clustering.features.is_empty() {
            return Err(AnalysisError::invalid_config("feature lists must not be empty"));
        }
        let c = &self.clustering;
        if c.n_init == 0 || c.max_iter == 0 {
            return Err(AnalysisError::invalid_config(
                "n_init and max_iter must be positive",
            ));
        }
        let t = &self.trend;
        if t.horizon == 0 {
            return Err(AnalysisError::invalid_config("forecast horizon must be positive"));
        }
        if !(t.confidence > 0.0 && t.confidence < 1.0) {
            return Err(AnalysisError::invalid_config(format!(
                "confidence must be within (0, 1), got {}",
                t.confidence
            )));
        }
        if self.ratios.min_bio_demo > self.ratios.max_bio_demo {
            return Err(AnalysisError::invalid_config(
                "min_bio_demo must not exceed max_bio_demo",
            ));
        }
        if self.growth.min_growth > self.growth.max_growth {
            return Err(AnalysisError::invalid_config(
                "min_growth must not exceed max_growth",
            ));
        }
        if self.columns.date_formats.is_empty() {
            return Err(AnalysisError::invalid_config(
                "at least one date format is required",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analysis Configuration:")?;
        writeln!(
            f,
            "  Columns: region={}, sub_region={}, date={}",
            self.columns.region, self.columns.sub_region, self.columns.date
        )?;
        writeln!(
            f,
            "  Z-score threshold: {}, IQR multiplier: {}",
            self.outliers.zscore_threshold, self.outliers.iqr_multiplier
        )?;
        writeln!(
            f,
            "  Update/enroll max: {}, bio/demo bounds: [{}, {}]",
            self.ratios.max_update_enroll, self.ratios.min_bio_demo, self.ratios.max_bio_demo
        )?;
        writeln!(
            f,
            "  Contamination: {}, trees: {}, seed: {}",
            self.anomaly.contamination, self.anomaly.n_estimators, self.anomaly.seed
        )?;
        writeln!(
            f,
            "  Clustering: K <= {}, restarts: {}",
            self.clustering.max_k, self.clustering.n_init
        )?;
        writeln!(
            f,
            "  Trend: {} monthly totals, ARIMA grid p<={} d<={} q<={}, horizon {}",
            self.trend.dataset,
            self.trend.max_p,
            self.trend.max_d,
            self.trend.max_q,
            self.trend.horizon
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.outliers.zscore_threshold, 2.0);
        assert_eq!(config.ratios.max_update_enroll, 2.0);
        assert_eq!(config.trend.horizon, 6);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json_str(
            r#"{ "anomaly": { "contamination": 0.15 }, "trend": { "dataset": "demographic" } }"#,
        )
        .unwrap();
        assert_eq!(config.anomaly.contamination, 0.15);
        assert_eq!(config.anomaly.n_estimators, 100);
        assert_eq!(config.trend.dataset, DatasetKind::Demographic);
        assert_eq!(config.columns.region, "state");
    }

    #[test]
    fn test_invalid_contamination_rejected() {
        let result = AnalysisConfig::from_json_str(r#"{ "anomaly": { "contamination": 0.9 } }"#);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }
}
