//! Cross-dataset ratio checks
//!
//! Updates far outpacing enrollments, or one update type dominating the
//! other, point at duplicate submissions or collection problems.

use serde::{Deserialize, Serialize};

use crate::config::RatioConfig;
use crate::models::MetricTable;

/// Which ratio rule a region broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioRule {
    /// `update_enroll_ratio` above its maximum
    UpdateEnrollHigh,
    /// `bio_demo_ratio` below its minimum
    BioDemoLow,
    /// `bio_demo_ratio` above its maximum
    BioDemoHigh,
}

/// A region breaking a ratio rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioFlag {
    /// Region identifier
    pub region: String,
    /// Rule broken
    pub rule: RatioRule,
    /// Ratio value
    pub value: f64,
}

/// Ratio flags grouped by rule, each in table order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioReport {
    /// Regions with too many updates per enrollment
    pub update_enroll: Vec<RatioFlag>,
    /// Regions with a bio/demo ratio outside the allowed band
    pub bio_demo: Vec<RatioFlag>,
}

/// Apply the ratio rules to every region
///
/// Comparisons are strict: a ratio exactly on a threshold is not flagged.
#[must_use]
pub fn check_ratios(table: &MetricTable, config: &RatioConfig) -> RatioReport {
    let mut report = RatioReport::default();
    for row in table.rows() {
        if row.update_enroll_ratio > config.max_update_enroll {
            report.update_enroll.push(RatioFlag {
                region: row.region.clone(),
                rule: RatioRule::UpdateEnrollHigh,
                value: row.update_enroll_ratio,
            });
        }

        let rule = if row.bio_demo_ratio < config.min_bio_demo {
            Some(RatioRule::BioDemoLow)
        } else if row.bio_demo_ratio > config.max_bio_demo {
            Some(RatioRule::BioDemoHigh)
        } else {
            None
        };
        if let Some(rule) = rule {
            report.bio_demo.push(RatioFlag {
                region: row.region.clone(),
                rule,
                value: row.bio_demo_ratio,
            });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::aggregation::aggregate_regions;
    use crate::models::{Dataset, DatasetKind, RawRecord};

    fn dataset(kind: DatasetKind, rows: &[(&str, f64)]) -> Dataset {
        let width = kind.count_columns().len();
        Dataset::from_records(
            kind,
            rows.iter()
                .map(|(region, total)| RawRecord {
                    region: (*region).to_string(),
                    sub_region: None,
                    date: None,
                    counts: std::iter::once(*total)
                        .chain(std::iter::repeat(0.0))
                        .take(width)
                        .collect(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_zero_enrollment_ratio_is_safe_and_flagged() {
        let bio = dataset(DatasetKind::Biometric, &[("A", 50.0)]);
        let table = aggregate_regions(&[bio]);
        assert_eq!(table.get("A").unwrap().update_enroll_ratio, 50.0);

        let report = check_ratios(&table, &RatioConfig::default());
        assert_eq!(report.update_enroll.len(), 1);
        assert_eq!(report.update_enroll[0].value, 50.0);
    }

    #[test]
    fn test_bio_demo_band() {
        let bio = dataset(DatasetKind::Biometric, &[("A", 1.0), ("B", 100.0), ("C", 10.0)]);
        let demo = dataset(DatasetKind::Demographic, &[("A", 99.0), ("B", 9.0), ("C", 9.0)]);
        let enroll = dataset(DatasetKind::Enrollment, &[("A", 1000.0), ("B", 1000.0), ("C", 1000.0)]);
        let table = aggregate_regions(&[bio, demo, enroll]);

        let report = check_ratios(&table, &RatioConfig::default());
        assert!(report.update_enroll.is_empty());
        let rules: Vec<(&str, RatioRule)> = report
            .bio_demo
            .iter()
            .map(|f| (f.region.as_str(), f.rule))
            .collect();
        // A: 1/100 = 0.01, B: 100/10 = 10, C: 10/10 = 1
        assert_eq!(rules, vec![("A", RatioRule::BioDemoLow), ("B", RatioRule::BioDemoHigh)]);
    }
}
