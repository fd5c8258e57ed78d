//! Region-level aggregation
//!
//! Groups each dataset by region, computes per-category statistics and
//! outer-joins the three kinds into one [`MetricTable`].

use log::debug;
use rustc_hash::FxHashMap;

use crate::models::{CategoryStats, Dataset, DatasetKind, MetricTable, RawRecord, RegionMetrics};
use crate::utils::stats::{mean, safe_ratio, sample_std};

type RowsByKind<'a> = [Vec<&'a RawRecord>; 3];

/// Aggregate datasets into a region metric table
///
/// Every region present in any dataset appears exactly once. Kinds with no
/// rows for a region are zero-filled. Ratios divide by `denominator + 1`,
/// which keeps zero denominators finite but biases ratios with small
/// denominators toward zero.
///
/// # Arguments
/// * `datasets` - Typed datasets; several datasets of one kind are merged
///
/// # Returns
/// The region metric table sorted by region identifier
#[must_use]
pub fn aggregate_regions(datasets: &[Dataset]) -> MetricTable {
    let mut grouped: FxHashMap<&str, RowsByKind<'_>> = FxHashMap::default();
    for dataset in datasets {
        for record in &dataset.records {
            grouped.entry(record.region.as_str()).or_default()[dataset.kind.index()].push(record);
        }
    }

    let rows = grouped
        .into_iter()
        .map(|(region, rows)| region_metrics(region, &rows))
        .collect::<Vec<_>>();

    debug!("Aggregated {} regions from {} datasets", rows.len(), datasets.len());
    MetricTable::new(rows)
}

fn region_metrics(region: &str, rows: &RowsByKind<'_>) -> RegionMetrics {
    let categories = DatasetKind::ALL.map(|kind| category_stats(kind, &rows[kind.index()]));
    let total = |kind: DatasetKind| -> f64 { categories[kind.index()].iter().map(|c| c.sum).sum() };

    let total_bio = total(DatasetKind::Biometric);
    let total_demo = total(DatasetKind::Demographic);
    let total_enroll = total(DatasetKind::Enrollment);

    RegionMetrics {
        region: region.to_string(),
        row_counts: DatasetKind::ALL.map(|kind| rows[kind.index()].len()),
        total_bio,
        total_demo,
        total_enroll,
        bio_demo_ratio: safe_ratio(total_bio, total_demo),
        bio_enroll_ratio: safe_ratio(total_bio, total_enroll),
        demo_enroll_ratio: safe_ratio(total_demo, total_enroll),
        update_enroll_ratio: safe_ratio(total_bio + total_demo, total_enroll),
        categories,
    }
}

fn category_stats(kind: DatasetKind, records: &[&RawRecord]) -> Vec<CategoryStats> {
    (0..kind.count_columns().len())
        .map(|col| {
            let values: Vec<f64> = records
                .iter()
                .map(|r| r.counts.get(col).copied().unwrap_or(0.0))
                .collect();
            CategoryStats {
                sum: values.iter().sum(),
                mean: mean(&values).unwrap_or(0.0),
                std: sample_std(&values).unwrap_or(0.0),
            }
        })
        .collect()
}
