//! Month-over-month growth per region

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::algorithm::aggregation::region_monthly_totals;
use crate::config::GrowthConfig;
use crate::models::{Dataset, DatasetKind, Finding, FindingCategory, Severity, Stage, YearMonth};

/// An unusual change between two consecutive observed months
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEvent {
    /// Region identifier
    pub region: String,
    /// Month of the new value
    pub period: YearMonth,
    /// Previous month's total
    pub previous: f64,
    /// This month's total
    pub current: f64,
    /// `current / previous - 1`
    pub growth: f64,
}

/// Unusual growth events for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthReport {
    /// Dataset analysed
    pub dataset: DatasetKind,
    /// Regions with at least two observed months
    pub regions_examined: usize,
    /// Events ordered by region then month
    pub events: Vec<GrowthEvent>,
    /// Number of events listed in the finding
    pub report_limit: usize,
}

/// Find growth outside `[min_growth, max_growth]`
///
/// Growth is compared between consecutive observed months of a region and
/// is undefined, so skipped, when the earlier month totals zero.
#[must_use]
pub fn analyze_growth(dataset: &Dataset, config: &GrowthConfig) -> GrowthReport {
    let monthly = region_monthly_totals(dataset);
    let regions_examined = monthly.values().filter(|months| months.len() > 1).count();

    let events = monthly
        .iter()
        .flat_map(|(region, months)| {
            months
                .iter()
                .tuple_windows()
                .filter_map(move |((_, &previous), (&period, &current))| {
                    if previous == 0.0 {
                        return None;
                    }
                    let growth = current / previous - 1.0;
                    (growth > config.max_growth || growth < config.min_growth).then(|| GrowthEvent {
                        region: region.clone(),
                        period,
                        previous,
                        current,
                        growth,
                    })
                })
        })
        .collect();

    GrowthReport {
        dataset: dataset.kind,
        regions_examined,
        events,
        report_limit: config.report_limit,
    }
}

impl GrowthReport {
    /// One trend finding listing the largest changes
    #[must_use]
    pub fn to_findings(&self) -> Vec<Finding> {
        if self.events.is_empty() {
            return Vec::new();
        }
        let top = self
            .events
            .iter()
            .sorted_by(|a, b| b.growth.abs().total_cmp(&a.growth.abs()))
            .take(self.report_limit)
            .collect_vec();
        let cases = top
            .iter()
            .map(|e| format!("{} {} ({:+.0}%)", e.region, e.period, e.growth * 100.0))
            .join(", ");
        vec![Finding::new(
            FindingCategory::Anomaly,
            Severity::Medium,
            Stage::Trend,
            "growth_pattern",
            format!(
                "{} unusual month-over-month changes in {} data: {cases}",
                self.events.len(),
                self.dataset
            ),
        )
        .with_regions(
            top.iter().map(|e| e.region.clone()).collect(),
            top.iter().map(|e| e.growth).collect(),
        )]
    }
}
