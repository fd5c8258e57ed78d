//! Shewhart control charts of daily totals for the busiest regions

use std::collections::BTreeMap;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::RelationConfig;
use crate::models::{Finding, FindingCategory, MetricTable, Severity, Stage};
use crate::utils::stats::{mean, sample_std};

/// Control chart of one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlChart {
    /// Region identifier
    pub region: String,
    /// Centre line
    pub mean: f64,
    /// Upper control limit
    pub ucl: f64,
    /// Lower control limit, never below zero
    pub lcl: f64,
    /// Daily points charted
    pub points: usize,
    /// Days outside the limits
    pub out_of_control: Vec<(NaiveDate, f64)>,
}

impl ControlChart {
    /// Share of points outside the limits, percent
    #[must_use]
    pub fn out_of_control_share(&self) -> f64 {
        if self.points == 0 {
            0.0
        } else {
            self.out_of_control.len() as f64 / self.points as f64 * 100.0
        }
    }

    /// A finding when any point is out of control
    #[must_use]
    pub fn to_finding(&self) -> Option<Finding> {
        if self.out_of_control.is_empty() {
            return None;
        }
        Some(
            Finding::new(
                FindingCategory::Anomaly,
                Severity::Medium,
                Stage::Trend,
                "control_chart",
                format!(
                    "{}: {} of {} days outside control limits [{:.1}, {:.1}] ({:.1}%)",
                    self.region,
                    self.out_of_control.len(),
                    self.points,
                    self.lcl,
                    self.ucl,
                    self.out_of_control_share()
                ),
            )
            .with_regions(
                vec![self.region.clone(); self.out_of_control.len()],
                self.out_of_control.iter().map(|(_, v)| *v).collect(),
            ),
        )
    }
}

/// Chart the daily totals of the `control_regions` regions with the most
/// biometric updates
///
/// Regions with fewer than `control_min_points` days are left out.
#[must_use]
pub fn control_charts(
    table: &MetricTable,
    daily: &BTreeMap<String, Vec<(NaiveDate, f64)>>,
    config: &RelationConfig,
) -> Vec<ControlChart> {
    table
        .rows()
        .iter()
        .sorted_by(|a, b| b.total_bio.total_cmp(&a.total_bio).then_with(|| a.region.cmp(&b.region)))
        .take(config.control_regions)
        .filter_map(|row| {
            let days = daily.get(&row.region)?;
            if days.len() < config.control_min_points.max(2) {
                return None;
            }
            let values = days.iter().map(|(_, v)| *v).collect_vec();
            let centre = mean(&values)?;
            let sd = sample_std(&values)?;
            let ucl = centre + config.control_sigma * sd;
            let lcl = (centre - config.control_sigma * sd).max(0.0);
            Some(ControlChart {
                region: row.region.clone(),
                mean: centre,
                ucl,
                lcl,
                points: days.len(),
                out_of_control: days
                    .iter()
                    .filter(|(_, v)| *v > ucl || *v < lcl)
                    .copied()
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionMetrics;

    fn region(name: &str, bio: f64) -> RegionMetrics {
        RegionMetrics {
            region: name.to_string(),
            categories: [vec![], vec![], vec![]],
            row_counts: [1, 0, 0],
            total_bio: bio,
            total_demo: 0.0,
            total_enroll: 0.0,
            bio_demo_ratio: bio,
            bio_enroll_ratio: bio,
            demo_enroll_ratio: 0.0,
            update_enroll_ratio: bio,
        }
    }

    fn days(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + chrono::Days::new(i as u64), *v))
            .collect()
    }

    #[test]
    fn test_spike_is_out_of_control() {
        let table = MetricTable::new(vec![region("A", 1000.0), region("B", 10.0)]);
        let mut values = vec![10.0; 30];
        values[29] = 100.0;
        let daily = BTreeMap::from([
            ("A".to_string(), days(&values)),
            ("B".to_string(), days(&[1.0, 2.0])),
        ]);

        let charts = control_charts(&table, &daily, &RelationConfig::default());
        assert_eq!(charts.len(), 1);
        let chart = &charts[0];
        assert_eq!(chart.region, "A");
        assert_eq!(chart.out_of_control.len(), 1);
        assert_eq!(chart.out_of_control[0].1, 100.0);
        assert_eq!(chart.lcl, 0.0);
        assert!(chart.to_finding().is_some());
    }

    #[test]
    fn test_only_top_regions_charted() {
        let table = MetricTable::new((0..7).map(|i| region(&format!("R{i}"), i as f64)).collect());
        let daily = (0..7)
            .map(|i| (format!("R{i}"), days(&[1.0, 2.0, 3.0, 2.0, 1.0])))
            .collect();
        let charts = control_charts(&table, &daily, &RelationConfig::default());
        let names: Vec<&str> = charts.iter().map(|c| c.region.as_str()).collect();
        assert_eq!(names, vec!["R6", "R5", "R4", "R3", "R2"]);
        assert!(charts.iter().all(|c| c.to_finding().is_none()));
    }
}
