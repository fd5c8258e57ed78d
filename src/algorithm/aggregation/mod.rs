//! Aggregation of typed records into region metrics and time buckets
//!
//! Every detector consumes the output of this module: the region metric
//! table for cross-sectional analyses and the time buckets for trend,
//! growth and control-chart analyses.

pub mod buckets;
pub mod region;

pub use buckets::{
    SubRegionTotal, monthly_totals, region_daily_totals, region_monthly_totals, sub_region_totals,
};
pub use region::aggregate_regions;
