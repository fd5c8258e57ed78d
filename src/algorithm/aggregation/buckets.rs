//! Time and sub-region bucketing
//!
//! Records without a date are excluded from the time buckets and nothing
//! else.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::models::{Dataset, YearMonth};

/// Monthly totals over all regions on a contiguous monthly range
///
/// Months between the first and last observed month with no records are
/// filled with zero. Returns an empty series when no record has a date.
#[must_use]
pub fn monthly_totals(dataset: &Dataset) -> Vec<(YearMonth, f64)> {
    let mut sums: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for record in &dataset.records {
        if let Some(date) = record.date {
            *sums.entry(YearMonth::from_date(date)).or_insert(0.0) += record.total();
        }
    }

    let (Some(&first), Some(&last)) = (sums.keys().next(), sums.keys().next_back()) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut period = first;
    while period <= last {
        series.push((period, sums.get(&period).copied().unwrap_or(0.0)));
        period = period.next();
    }
    series
}

/// Totals per region per observed month
///
/// Only months with at least one dated record for the region are present.
#[must_use]
pub fn region_monthly_totals(dataset: &Dataset) -> BTreeMap<String, BTreeMap<YearMonth, f64>> {
    let mut out: BTreeMap<String, BTreeMap<YearMonth, f64>> = BTreeMap::new();
    for record in &dataset.records {
        if let Some(date) = record.date {
            *out.entry(record.region.clone())
                .or_default()
                .entry(YearMonth::from_date(date))
                .or_insert(0.0) += record.total();
        }
    }
    out
}

/// Totals per region per observed day, in date order
#[must_use]
pub fn region_daily_totals(dataset: &Dataset) -> BTreeMap<String, Vec<(NaiveDate, f64)>> {
    let mut daily: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for record in &dataset.records {
        if let Some(date) = record.date {
            *daily
                .entry(record.region.clone())
                .or_default()
                .entry(date)
                .or_insert(0.0) += record.total();
        }
    }
    daily
        .into_iter()
        .map(|(region, days)| (region, days.into_iter().collect_vec()))
        .collect()
}

/// Total of one sub-region within its region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRegionTotal {
    /// Parent region
    pub region: String,
    /// Sub-region identifier
    pub sub_region: String,
    /// Sum of all category counts
    pub total: f64,
}

/// Totals per (region, sub-region), sorted by region then sub-region
///
/// Records without a sub-region are ignored.
#[must_use]
pub fn sub_region_totals(dataset: &Dataset) -> Vec<SubRegionTotal> {
    dataset
        .records
        .iter()
        .filter_map(|r| {
            r.sub_region
                .as_ref()
                .map(|sub| ((r.region.clone(), sub.clone()), r.total()))
        })
        .into_grouping_map()
        .sum()
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .map(|((region, sub_region), total)| SubRegionTotal {
            region,
            sub_region,
            total,
        })
        .collect()
}
