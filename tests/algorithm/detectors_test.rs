use region_audit::algorithm::aggregation::aggregate_regions;
use region_audit::algorithm::anomaly::score_regions;
use region_audit::algorithm::clustering::{ClusteringOutcome, cluster_regions};
use region_audit::algorithm::outliers::{IqrDetector, UnivariateDetector, ZScoreDetector};
use region_audit::algorithm::ratio::{RatioRule, check_ratios};
use region_audit::config::{AnomalyConfig, ClusteringConfig, ColumnConfig, RatioConfig};
use region_audit::models::{Metric, MetricTable, convert_table};

use crate::utils::{RegionProfile, monthly_tables, three_region_profiles, twelve_region_profiles};

fn metric_table(profiles: &[RegionProfile]) -> MetricTable {
    let datasets: Vec<_> = monthly_tables(profiles, 4)
        .iter()
        .map(|t| convert_table(t, &ColumnConfig::default()).unwrap())
        .collect();
    aggregate_regions(&datasets)
}

#[test]
fn test_zscore_bounds_and_scores() {
    let detection = ZScoreDetector::new(2.0)
        .detect(&[10.0, 11.0, 9.0, 10.0, 10.0, 11.0, 9.0, 10.0, 10.0, 50.0])
        .unwrap();
    assert_eq!(detection.outliers.len(), 1);
    assert_eq!(detection.outliers[0].index, 9);
    assert!(detection.outliers[0].score > 2.0);
    assert!(detection.lower < 10.0 && detection.upper < 50.0);
}

#[test]
fn test_constant_metric_is_degenerate_for_both_detectors() {
    let table = metric_table(&three_region_profiles());
    let z = ZScoreDetector::default().detect_metric(&table, Metric::TotalDemo);
    let iqr = IqrDetector::default().detect_metric(&table, Metric::TotalDemo);
    assert!(z.is_degenerate() && z.outliers.is_empty());
    assert!(iqr.is_degenerate() && iqr.outliers.is_empty());
}

#[test]
fn test_iqr_fences_on_regions() {
    let table = metric_table(&twelve_region_profiles());
    let report = IqrDetector::new(1.5).detect_metric(&table, Metric::TotalBio);
    let (lower, upper) = report.bounds.unwrap();
    assert!((lower - 450.0).abs() < 1e-9);
    assert!((upper - 2650.0).abs() < 1e-9);
    assert_eq!(report.outliers.len(), 1);
    assert_eq!(report.outliers[0].region, "Z");
    assert_eq!(report.outliers[0].value, 20000.0);
}

#[test]
fn test_ratio_rules_are_strict() {
    let table = metric_table(&three_region_profiles());
    // A sits at 4000 / 801, just under 5
    let config = RatioConfig {
        max_bio_demo: 4000.0 / 801.0,
        ..RatioConfig::default()
    };
    let report = check_ratios(&table, &config);
    assert!(report.bio_demo.is_empty());

    let config = RatioConfig {
        max_bio_demo: 4.9,
        ..RatioConfig::default()
    };
    let report = check_ratios(&table, &config);
    assert_eq!(report.bio_demo.len(), 1);
    assert_eq!(report.bio_demo[0].rule, RatioRule::BioDemoHigh);
    assert_eq!(report.update_enroll[0].region, "A");
}

#[test]
fn test_anomaly_scores_are_reproducible() {
    let table = metric_table(&twelve_region_profiles());
    let config = AnomalyConfig::default();
    let first = score_regions(&table, &config, false).unwrap();
    let second = score_regions(&table, &config, false).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.scores.len(), 12);
    assert_eq!(first.scores.iter().filter(|s| s.flagged).count(), 2);
}

#[test]
fn test_two_separated_groups_select_k_two() {
    let small = |region: &'static str, bump: i64| RegionProfile {
        region,
        bio: [20, 80 + bump],
        demo: [100, 200],
        enroll: [100, 100, 100],
    };
    let large = |region: &'static str, bump: i64| RegionProfile {
        region,
        bio: [2000, 8000 + bump],
        demo: [2000, 3000],
        enroll: [10, 10, 10],
    };
    let profiles = vec![
        small("S1", 0),
        large("L1", 0),
        small("S2", 3),
        large("L2", 7),
        small("S3", 5),
        large("L3", 12),
        small("S4", 1),
        large("L4", 4),
    ];
    let table = metric_table(&profiles);

    let outcome = cluster_regions(&table, &ClusteringConfig::default()).unwrap();
    let ClusteringOutcome::Clustered(report) = outcome else {
        panic!("expected a partition");
    };
    assert_eq!(report.k, 2);
    assert!(report.silhouette > 0.8);
    assert_eq!(report.candidates.len(), 3);
    for (region, label) in &report.assignments {
        let expected = usize::from(region.starts_with('S'));
        assert_eq!(*label, expected, "{region}");
    }
}
