//! Multivariate anomaly scoring of regions
//!
//! Regions are scored on standardized features with an isolation forest.
//! The reported score follows the decision-function convention: lower is
//! more anomalous and the contamination fraction of regions scores below
//! zero.

pub mod isolation_forest;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::AnomalyConfig;
use crate::error::Result;
use crate::models::{Metric, MetricTable};
use crate::utils::logging::{create_progress_bar, finish_progress_bar};
use crate::utils::stats::{quantile_sorted, sorted, standardize};

pub use isolation_forest::{ForestParams, IsolationForest};

/// Score of one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    /// Region identifier
    pub region: String,
    /// Decision score; lower is more anomalous
    pub score: f64,
    /// Whether the region is among the most anomalous
    pub flagged: bool,
}

/// Scores for every region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Features the model was fitted on
    pub features: Vec<Metric>,
    /// Contamination rate used for flagging
    pub contamination: f64,
    /// Scores in table order
    pub scores: Vec<AnomalyScore>,
}

impl AnomalyReport {
    /// Flagged regions, most anomalous first
    #[must_use]
    pub fn flagged(&self) -> Vec<&AnomalyScore> {
        let mut flagged: Vec<&AnomalyScore> = self.scores.iter().filter(|s| s.flagged).collect();
        flagged.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.region.cmp(&b.region)));
        flagged
    }
}

/// Number of regions flagged for a contamination rate
///
/// `ceil(c * n)`, with a small tolerance so exact products are not rounded up.
#[must_use]
pub fn flag_count(contamination: f64, n: usize) -> usize {
    ((contamination * n as f64 - 1e-9).ceil().max(0.0) as usize).min(n)
}

/// Score every region of the table
///
/// Non-finite feature values are treated as zero before standardization.
/// Ties in score are broken by region identifier.
///
/// # Errors
/// Returns an error when the table has fewer than two regions or the forest
/// parameters are invalid
pub fn score_regions(
    table: &MetricTable,
    config: &AnomalyConfig,
    show_progress: bool,
) -> Result<AnomalyReport> {
    let features = standardize(&table.feature_matrix(&config.features));
    let params = ForestParams {
        n_estimators: config.n_estimators,
        max_samples: config.max_samples,
        seed: config.seed,
    };

    let pb = create_progress_bar(config.n_estimators as u64, "Growing isolation trees", show_progress);
    let forest = IsolationForest::fit(&features, &params, &pb)?;
    finish_progress_bar(&pb, Some("Isolation forest ready"));

    let negated: Vec<f64> = forest.score_samples(&features).into_iter().map(|s| -s).collect();
    let offset = quantile_sorted(&sorted(&negated), config.contamination).unwrap_or(0.0);
    let decision: Vec<f64> = negated.iter().map(|s| s - offset).collect();

    // table rows are already in region order, so the index breaks ties
    let mut order: Vec<usize> = (0..decision.len()).collect();
    order.sort_by(|&a, &b| decision[a].total_cmp(&decision[b]).then(a.cmp(&b)));
    let n_flagged = flag_count(config.contamination, decision.len());
    let mut flagged = vec![false; decision.len()];
    for &idx in &order[..n_flagged] {
        flagged[idx] = true;
    }

    info!("Isolation forest flagged {n_flagged} of {} regions", decision.len());

    let scores = table
        .rows()
        .iter()
        .zip(decision)
        .zip(flagged)
        .map(|((row, score), flagged)| AnomalyScore {
            region: row.region.clone(),
            score,
            flagged,
        })
        .collect();

    Ok(AnomalyReport {
        features: config.features.clone(),
        contamination: config.contamination,
        scores,
    })
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
            bio_demo_ratio: bio / (demo + 1.0),
            bio_enroll_ratio: bio / (enroll + 1.0),
            demo_enroll_ratio: demo / (enroll + 1.0),
            update_enroll_ratio: (bio + demo) / (enroll + 1.0),
        }
    }

    fn table(n: usize) -> MetricTable {
        let mut rows: Vec<RegionMetrics> = (0..n)
            .map(|i| {
                let jitter = (i % 4) as f64;
                region(&format!("R{i:02}"), 100.0 + jitter, 80.0 + jitter, 200.0 - jitter)
            })
            .collect();
        rows.push(region("ZZ", 5000.0, 80.0, 0.0));
        MetricTable::new(rows)
    }

    #[test]
    fn test_flag_count() {
        assert_eq!(flag_count(0.1, 3), 1);
        assert_eq!(flag_count(0.1, 20), 2);
        assert_eq!(flag_count(0.1, 21), 3);
        assert_eq!(flag_count(0.0, 20), 0);
        assert_eq!(flag_count(0.5, 1), 1);
    }

    #[test]
    fn test_contamination_bound_and_lowest_scores() {
        let table = table(19);
        let report = score_regions(&table, &AnomalyConfig::default(), false).unwrap();

        let flagged = report.flagged();
        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0].region, "ZZ");

        let max_flagged = flagged.iter().map(|s| s.score).fold(f64::NEG_INFINITY, f64::max);
        assert!(report
            .scores
            .iter()
            .filter(|s| !s.flagged)
            .all(|s| s.score >= max_flagged));
    }

    #[test]
    fn test_non_finite_features_do_not_poison_scores() {
        let mut rows: Vec<RegionMetrics> = (0..9)
            .map(|i| region(&format!("R{i}"), 10.0 * i as f64, 5.0, 5.0))
            .collect();
        rows[3].bio_demo_ratio = f64::INFINITY;
        rows[4].update_enroll_ratio = f64::NAN;
        let report = score_regions(&MetricTable::new(rows), &AnomalyConfig::default(), false).unwrap();
        assert!(report.scores.iter().all(|s| s.score.is_finite()));
    }
}
