//! Spatial comparison: underperforming regions, extreme sub-regions and
//! resource-need hotspots

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::algorithm::aggregation::SubRegionTotal;
use crate::config::SpatialConfig;
use crate::models::{Finding, FindingCategory, MetricTable, Severity, Stage};
use crate::utils::stats::average_ranks;

/// A region and one metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionValue {
    /// Region identifier
    pub region: String,
    /// Metric value
    pub value: f64,
}

/// A sub-region at the edge of its region's distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRegionRank {
    /// Parent region
    pub region: String,
    /// Sub-region identifier
    pub sub_region: String,
    /// Sub-region total
    pub total: f64,
    /// Percentile rank within the region, in `(0, 1]`
    pub percentile: f64,
}

/// Need category from equal-width bins of the hotspot score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedLevel {
    /// Lowest quarter of the score range
    Low,
    /// Second quarter
    Medium,
    /// Third quarter
    High,
    /// Top quarter
    Critical,
}

impl fmt::Display for NeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Resource-need score of a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Region identifier
    pub region: String,
    /// Updates per `intensity_scale`
    pub intensity: f64,
    /// Update-to-enrollment ratio
    pub update_ratio: f64,
    /// Weighted score of the min-max normalized inputs
    pub score: f64,
    /// Binned score
    pub level: NeedLevel,
}

/// Spatial comparison results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialReport {
    /// Lowest biometric-volume regions, ascending
    pub underperformers: Vec<RegionValue>,
    /// Sub-regions outside the percentile band, by region then sub-region
    pub sub_region_extremes: Vec<SubRegionRank>,
    /// Hotspot score per region in table order
    pub hotspots: Vec<Hotspot>,
}

/// The `max(min_underperformers, floor(bottom_fraction * n))` regions with
/// the lowest biometric volume, ties broken by region
#[must_use]
pub fn underperforming_regions(table: &MetricTable, config: &SpatialConfig) -> Vec<RegionValue> {
    let n = table.len();
    let count = ((config.bottom_fraction * n as f64).floor() as usize)
        .max(config.min_underperformers)
        .min(n);
    table
        .rows()
        .iter()
        .map(|row| RegionValue {
            region: row.region.clone(),
            value: row.total_bio,
        })
        .sorted_by(|a, b| a.value.total_cmp(&b.value).then_with(|| a.region.cmp(&b.region)))
        .take(count)
        .collect()
}

/// Sub-regions whose percentile rank within their region falls outside
/// `[lower_percentile, upper_percentile]`
///
/// `totals` must be grouped by region, as produced by
/// [`sub_region_totals`](crate::algorithm::aggregation::sub_region_totals).
#[must_use]
pub fn sub_region_extremes(totals: &[SubRegionTotal], config: &SpatialConfig) -> Vec<SubRegionRank> {
    let by_region = totals.iter().chunk_by(|t| t.region.as_str());
    by_region
        .into_iter()
        .flat_map(|(_, group)| {
            let group = group.collect_vec();
            let values = group.iter().map(|t| t.total).collect_vec();
            let count = values.len() as f64;
            average_ranks(&values)
                .into_iter()
                .zip(group)
                .map(move |(rank, t)| SubRegionRank {
                    region: t.region.clone(),
                    sub_region: t.sub_region.clone(),
                    total: t.total,
                    percentile: rank / count,
                })
                .collect_vec()
        })
        .filter(|r| r.percentile > config.upper_percentile || r.percentile < config.lower_percentile)
        .collect()
}

fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let range = hi - lo;
    values
        .iter()
        .map(|v| if range > 0.0 { (v - lo) / range } else { 0.0 })
        .collect()
}

/// Score every region's resource need
///
/// Levels come from four equal-width bins over the observed score range,
/// right-inclusive; when every score is equal all regions are `Low`.
#[must_use]
pub fn hotspot_scores(table: &MetricTable, config: &SpatialConfig) -> Vec<Hotspot> {
    let intensity: Vec<f64> = table
        .rows()
        .iter()
        .map(|r| r.total_updates() / config.intensity_scale)
        .collect();
    let ratio = table.column(crate::models::Metric::UpdateEnrollRatio);
    let scores: Vec<f64> = min_max_normalize(&intensity)
        .into_iter()
        .zip(min_max_normalize(&ratio))
        .map(|(i, r)| config.intensity_weight * i + config.ratio_weight * r)
        .collect();

    let (lo, hi) = scores
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let width = (hi - lo) / 4.0;
    let level = |score: f64| {
        if width <= 0.0 {
            return NeedLevel::Low;
        }
        let bin = ((score - lo) / width).ceil() as i64 - 1;
        match bin.clamp(0, 3) {
            0 => NeedLevel::Low,
            1 => NeedLevel::Medium,
            2 => NeedLevel::High,
            _ => NeedLevel::Critical,
        }
    };

    table
        .rows()
        .iter()
        .zip(intensity)
        .zip(ratio)
        .zip(scores)
        .map(|(((row, intensity), update_ratio), score)| Hotspot {
            region: row.region.clone(),
            intensity,
            update_ratio,
            score,
            level: level(score),
        })
        .collect()
}

impl SpatialReport {
    /// Findings for underperformers and critical hotspots; sub-region
    /// extremes stay in the bundle
    #[must_use]
    pub fn to_findings(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        if !self.underperformers.is_empty() {
            findings.push(
                Finding::new(
                    FindingCategory::Geographic,
                    Severity::Low,
                    Stage::Spatial,
                    "underperforming_regions",
                    format!(
                        "Lowest biometric volume: {}",
                        self.underperformers.iter().map(|r| &r.region).join(", ")
                    ),
                )
                .with_regions(
                    self.underperformers.iter().map(|r| r.region.clone()).collect(),
                    self.underperformers.iter().map(|r| r.value).collect(),
                ),
            );
        }

        let critical = self
            .hotspots
            .iter()
            .filter(|h| h.level == NeedLevel::Critical)
            .collect_vec();
        if !critical.is_empty() {
            findings.push(
                Finding::new(
                    FindingCategory::Geographic,
                    Severity::High,
                    Stage::Spatial,
                    "hotspot_score",
                    format!(
                        "Critical resource need: {}",
                        critical.iter().map(|h| &h.region).join(", ")
                    ),
                )
                .with_regions(
                    critical.iter().map(|h| h.region.clone()).collect(),
                    critical.iter().map(|h| h.score).collect(),
                ),
            );
        }
        findings
    }
}
