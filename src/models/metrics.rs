//! Region metric table
//!
//! One row per region with per-category statistics, per-kind totals and the
//! cross-kind ratios. This is the table every detector consumes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::dataset::DatasetKind;
use crate::utils::stats::finite_or_zero;

/// A named column of the region metric table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Biometric updates, age 5-17
    BioYouth,
    /// Biometric updates, age 17+
    BioAdult,
    /// Demographic updates, age 5-17
    DemoYouth,
    /// Demographic updates, age 17+
    DemoAdult,
    /// Enrollments, age 0-5
    EnrollChild,
    /// Enrollments, age 5-17
    EnrollYouth,
    /// Enrollments, age 18+
    EnrollAdult,
    /// All biometric updates
    TotalBio,
    /// All demographic updates
    TotalDemo,
    /// All enrollments
    TotalEnroll,
    /// `total_bio / (total_demo + 1)`
    BioDemoRatio,
    /// `total_bio / (total_enroll + 1)`
    BioEnrollRatio,
    /// `total_demo / (total_enroll + 1)`
    DemoEnrollRatio,
    /// `(total_bio + total_demo) / (total_enroll + 1)`
    UpdateEnrollRatio,
}

impl Metric {
    /// The seven raw category sums, in dataset order
    pub const CATEGORY_SUMS: [Self; 7] = [
        Self::BioYouth,
        Self::BioAdult,
        Self::DemoYouth,
        Self::DemoAdult,
        Self::EnrollChild,
        Self::EnrollYouth,
        Self::EnrollAdult,
    ];

    /// Column name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BioYouth => "bio_youth_sum",
            Self::BioAdult => "bio_adult_sum",
            Self::DemoYouth => "demo_youth_sum",
            Self::DemoAdult => "demo_adult_sum",
            Self::EnrollChild => "enroll_child_sum",
            Self::EnrollYouth => "enroll_youth_sum",
            Self::EnrollAdult => "enroll_adult_sum",
            Self::TotalBio => "total_bio",
            Self::TotalDemo => "total_demo",
            Self::TotalEnroll => "total_enroll",
            Self::BioDemoRatio => "bio_demo_ratio",
            Self::BioEnrollRatio => "bio_enroll_ratio",
            Self::DemoEnrollRatio => "demo_enroll_ratio",
            Self::UpdateEnrollRatio => "update_enroll_ratio",
        }
    }

    /// Dataset kind and column index for category sums
    #[must_use]
    pub const fn category(self) -> Option<(DatasetKind, usize)> {
        match self {
            Self::BioYouth => Some((DatasetKind::Biometric, 0)),
            Self::BioAdult => Some((DatasetKind::Biometric, 1)),
            Self::DemoYouth => Some((DatasetKind::Demographic, 0)),
            Self::DemoAdult => Some((DatasetKind::Demographic, 1)),
            Self::EnrollChild => Some((DatasetKind::Enrollment, 0)),
            Self::EnrollYouth => Some((DatasetKind::Enrollment, 1)),
            Self::EnrollAdult => Some((DatasetKind::Enrollment, 2)),
            _ => None,
        }
    }

    /// The total metric for a dataset kind
    #[must_use]
    pub const fn total_of(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::Biometric => Self::TotalBio,
            DatasetKind::Demographic => Self::TotalDemo,
            DatasetKind::Enrollment => Self::TotalEnroll,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sum, mean and sample standard deviation of one category within a region
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Sum of the category over the region's rows
    pub sum: f64,
    /// Mean per row
    pub mean: f64,
    /// Sample standard deviation per row (0 with fewer than two rows)
    pub std: f64,
}

/// Aggregated metrics for one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    /// Region identifier
    pub region: String,
    /// Category statistics per dataset kind, indexed by [`DatasetKind::index`]
    pub categories: [Vec<CategoryStats>; 3],
    /// Number of raw rows per dataset kind
    pub row_counts: [usize; 3],
    /// All biometric updates
    pub total_bio: f64,
    /// All demographic updates
    pub total_demo: f64,
    /// All enrollments
    pub total_enroll: f64,
    /// `total_bio / (total_demo + 1)`
    pub bio_demo_ratio: f64,
    /// `total_bio / (total_enroll + 1)`
    pub bio_enroll_ratio: f64,
    /// `total_demo / (total_enroll + 1)`
    pub demo_enroll_ratio: f64,
    /// `(total_bio + total_demo) / (total_enroll + 1)`
    pub update_enroll_ratio: f64,
}

impl RegionMetrics {
    /// Category statistics for one dataset kind
    #[must_use]
    pub fn categories(&self, kind: DatasetKind) -> &[CategoryStats] {
        &self.categories[kind.index()]
    }

    /// Total for one dataset kind
    #[must_use]
    pub fn total(&self, kind: DatasetKind) -> f64 {
        match kind {
            DatasetKind::Biometric => self.total_bio,
            DatasetKind::Demographic => self.total_demo,
            DatasetKind::Enrollment => self.total_enroll,
        }
    }

    /// Combined biometric and demographic updates
    #[must_use]
    pub fn total_updates(&self) -> f64 {
        self.total_bio + self.total_demo
    }

    /// Value of a metric; always finite
    #[must_use]
    pub fn value(&self, metric: Metric) -> f64 {
        let raw = match metric {
            Metric::TotalBio => self.total_bio,
            Metric::TotalDemo => self.total_demo,
            Metric::TotalEnroll => self.total_enroll,
            Metric::BioDemoRatio => self.bio_demo_ratio,
            Metric::BioEnrollRatio => self.bio_enroll_ratio,
            Metric::DemoEnrollRatio => self.demo_enroll_ratio,
            Metric::UpdateEnrollRatio => self.update_enroll_ratio,
            category => category
                .category()
                .and_then(|(kind, idx)| self.categories(kind).get(idx))
                .map_or(0.0, |stats| stats.sum),
        };
        finite_or_zero(raw)
    }
}

/// Region-indexed metric table, sorted by region identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    rows: Vec<RegionMetrics>,
}

impl MetricTable {
    /// Build a table; rows are sorted by region
    #[must_use]
    pub fn new(mut rows: Vec<RegionMetrics>) -> Self {
        rows.sort_by(|a, b| a.region.cmp(&b.region));
        Self { rows }
    }

    /// All rows in region order
    #[must_use]
    pub fn rows(&self) -> &[RegionMetrics] {
        &self.rows
    }

    /// Number of regions
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no regions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Region identifiers in table order
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.region.as_str()).collect()
    }

    /// Look up one region
    #[must_use]
    pub fn get(&self, region: &str) -> Option<&RegionMetrics> {
        self.rows
            .binary_search_by(|row| row.region.as_str().cmp(region))
            .ok()
            .map(|idx| &self.rows[idx])
    }

    /// One metric for every region, in table order
    #[must_use]
    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.rows.iter().map(|row| row.value(metric)).collect()
    }

    /// Region x feature matrix with non-finite values replaced by zero
    #[must_use]
    pub fn feature_matrix(&self, features: &[Metric]) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| features.iter().map(|&m| row.value(m)).collect())
            .collect()
    }
}
