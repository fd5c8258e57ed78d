//! Pearson correlation between category sums

use serde::{Deserialize, Serialize};

use crate::models::{Metric, MetricTable};
use crate::utils::stats::pearson;

/// Symmetric correlation matrix; `None` where a column has zero variance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Row and column labels
    pub metrics: Vec<Metric>,
    /// Coefficients, row-major
    pub values: Vec<Vec<Option<f64>>>,
}

/// A pair of metrics moving together (or against each other)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongPair {
    /// First metric
    pub first: Metric,
    /// Second metric
    pub second: Metric,
    /// Correlation coefficient
    pub r: f64,
}

/// Correlation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    /// Full matrix
    pub matrix: CorrelationMatrix,
    /// Pairs with `|r|` above the threshold, in matrix order
    pub strong_pairs: Vec<StrongPair>,
}

/// Correlation matrix of `metrics` across regions
#[must_use]
pub fn correlation_matrix(table: &MetricTable, metrics: &[Metric]) -> CorrelationMatrix {
    let columns: Vec<Vec<f64>> = metrics.iter().map(|&m| table.column(m)).collect();
    let values = columns
        .iter()
        .map(|a| columns.iter().map(|b| pearson(a, b)).collect())
        .collect();
    CorrelationMatrix {
        metrics: metrics.to_vec(),
        values,
    }
}

impl CorrelationMatrix {
    /// Upper-triangle pairs with `|r| > threshold`
    #[must_use]
    pub fn strong_pairs(&self, threshold: f64) -> Vec<StrongPair> {
        let n = self.metrics.len();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .filter_map(|(i, j)| {
                let r = self.values[i][j]?;
                (r.abs() > threshold).then_some(StrongPair {
                    first: self.metrics[i],
                    second: self.metrics[j],
                    r,
                })
            })
            .collect()
    }
}

/// Correlate the seven category sums and pick out strong pairs
#[must_use]
pub fn analyze_correlations(table: &MetricTable, threshold: f64) -> CorrelationReport {
    let matrix = correlation_matrix(table, &Metric::CATEGORY_SUMS);
    let strong_pairs = matrix.strong_pairs(threshold);
    CorrelationReport {
        matrix,
        strong_pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionMetrics;

    fn region(name: &str, bio: f64, demo: f64, enroll: f64) -> RegionMetrics {
        RegionMetrics {
            region: name.to_string(),
            categories: [vec![], vec![], vec![]],
            row_counts: [1, 1, 1],
            total_bio: bio,
            total_demo: demo,
            total_enroll: enroll,
            bio_demo_ratio: 0.0,
            bio_enroll_ratio: 0.0,
            demo_enroll_ratio: 0.0,
            update_enroll_ratio: 0.0,
        }
    }

    #[test]
    fn test_strong_pairs() {
        let table = MetricTable::new(vec![
            region("A", 1.0, 10.0, 5.0),
            region("B", 2.0, 20.0, 1.0),
            region("C", 3.0, 30.0, 4.0),
            region("D", 4.0, 40.0, 2.0),
        ]);
        let metrics = [Metric::TotalBio, Metric::TotalDemo, Metric::TotalEnroll];
        let matrix = correlation_matrix(&table, &metrics);
        assert!((matrix.values[0][0].unwrap() - 1.0).abs() < 1e-12);

        let pairs = matrix.strong_pairs(0.8);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].first, pairs[0].second), (Metric::TotalBio, Metric::TotalDemo));
    }

    #[test]
    fn test_constant_columns_have_no_coefficient() {
        // category sums are all zero here
        let table = MetricTable::new(vec![region("A", 1.0, 1.0, 1.0), region("B", 2.0, 2.0, 2.0)]);
        let report = analyze_correlations(&table, 0.8);
        assert_eq!(report.matrix.metrics.len(), 7);
        assert!(report.matrix.values.iter().flatten().all(Option::is_none));
        assert!(report.strong_pairs.is_empty());
    }
}
