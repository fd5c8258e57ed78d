//! Age-band segmentation of updates

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::DemographicConfig;
use crate::models::{DatasetKind, Finding, FindingCategory, Metric, MetricTable, Severity, Stage};

/// Youth share of a region's updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YouthShare {
    /// Region identifier
    pub region: String,
    /// Percentage of updates in the 5-17 band
    pub share: f64,
}

/// Divergence between biometric and demographic age patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternGap {
    /// Region identifier
    pub region: String,
    /// Youth share of biometric updates, percent
    pub bio_share: f64,
    /// Youth share of demographic updates, percent
    pub demo_share: f64,
    /// Absolute difference in percentage points
    pub gap: f64,
}

/// Segmentation results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicReport {
    /// Regions whose biometric updates are dominated by youth
    pub high_youth: Vec<YouthShare>,
    /// Regions whose biometric updates have very few youth
    pub low_youth: Vec<YouthShare>,
    /// Regions where the two update kinds have different age patterns
    pub pattern_gaps: Vec<PatternGap>,
}

fn youth_share(table: &MetricTable, kind: DatasetKind) -> Vec<Option<f64>> {
    let youth = match kind {
        DatasetKind::Demographic => Metric::DemoYouth,
        _ => Metric::BioYouth,
    };
    table
        .rows()
        .iter()
        .map(|row| {
            let total = row.total(kind);
            (total > 0.0).then(|| row.value(youth) / total * 100.0)
        })
        .collect()
}

/// Segment regions by the age profile of their updates
///
/// Regions without updates of a kind have no share for it and are not
/// flagged.
#[must_use]
pub fn segment_regions(table: &MetricTable, config: &DemographicConfig) -> DemographicReport {
    let bio = youth_share(table, DatasetKind::Biometric);
    let demo = youth_share(table, DatasetKind::Demographic);
    let mut report = DemographicReport::default();

    for ((row, bio), demo) in table.rows().iter().zip(bio).zip(demo) {
        if let Some(share) = bio {
            let entry = YouthShare {
                region: row.region.clone(),
                share,
            };
            if share > config.max_youth_share {
                report.high_youth.push(entry);
            } else if share < config.min_youth_share {
                report.low_youth.push(entry);
            }
        }
        if let (Some(bio_share), Some(demo_share)) = (bio, demo) {
            let gap = (bio_share - demo_share).abs();
            if gap > config.max_pattern_gap {
                report.pattern_gaps.push(PatternGap {
                    region: row.region.clone(),
                    bio_share,
                    demo_share,
                    gap,
                });
            }
        }
    }
    report
}

impl DemographicReport {
    /// One finding per non-empty group
    #[must_use]
    pub fn to_findings(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut share_finding = |shares: &[YouthShare], what: &str| {
            if shares.is_empty() {
                return;
            }
            findings.push(
                Finding::new(
                    FindingCategory::Distribution,
                    Severity::Medium,
                    Stage::Demographic,
                    "youth_share",
                    format!(
                        "{what} youth share of biometric updates: {}",
                        shares.iter().map(|s| format!("{} ({:.1}%)", s.region, s.share)).join(", ")
                    ),
                )
                .with_regions(
                    shares.iter().map(|s| s.region.clone()).collect(),
                    shares.iter().map(|s| s.share).collect(),
                ),
            );
        };
        share_finding(&self.high_youth, "High");
        share_finding(&self.low_youth, "Low");

        if !self.pattern_gaps.is_empty() {
            findings.push(
                Finding::new(
                    FindingCategory::Distribution,
                    Severity::Low,
                    Stage::Demographic,
                    "age_pattern_gap",
                    format!(
                        "Biometric and demographic age patterns diverge in {}",
                        self.pattern_gaps.iter().map(|g| &g.region).join(", ")
                    ),
                )
                .with_regions(
                    self.pattern_gaps.iter().map(|g| g.region.clone()).collect(),
                    self.pattern_gaps.iter().map(|g| g.gap).collect(),
                ),
            );
        }
        findings
    }
}
