use region_audit::algorithm::clustering::ClusteringOutcome;
use region_audit::algorithm::timeseries::TrendOutcome;
use region_audit::models::{Metric, Severity, Stage, YearMonth};
use region_audit::{AnalysisConfig, AnalysisError, Analyzer, DatasetKind, RawTable};

use crate::utils::{
    Row, batch, mid_month, monthly_tables, three_region_profiles, twelve_region_profiles,
};

fn detectors(report: &region_audit::AnalysisReport) -> Vec<&str> {
    report.findings.iter().map(|f| f.detector()).collect()
}

fn flagged_by(report: &region_audit::AnalysisReport, detector: &str, metric: Metric) -> Vec<String> {
    report
        .outliers
        .iter()
        .find(|r| r.detector == detector && r.metric == metric)
        .map(|r| r.outliers.iter().map(|o| o.region.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn test_three_region_surge() {
    let tables = monthly_tables(&three_region_profiles(), 4);
    let report = Analyzer::new(AnalysisConfig::default()).run(&tables).unwrap();

    assert_eq!(report.metrics.len(), 3);
    let a = report.metrics.get("A").unwrap();
    assert_eq!(a.total_bio, 4000.0);
    assert_eq!(a.total_enroll, 0.0);

    let ratio_regions: Vec<&str> = report
        .ratios
        .update_enroll
        .iter()
        .map(|f| f.region.as_str())
        .collect();
    assert_eq!(ratio_regions, vec!["A"]);

    let anomalies = report.anomalies.as_ref().unwrap();
    let flagged: Vec<&str> = anomalies.flagged().iter().map(|s| s.region.as_str()).collect();
    assert_eq!(flagged, vec!["A"]);

    // three values can never reach |z| = 2
    assert!(flagged_by(&report, "z_score", Metric::TotalBio).is_empty());

    assert!(report.findings.len() >= 4, "{:#?}", report.findings);
    let names = detectors(&report);
    assert!(names.contains(&"update_enroll_ratio"));
    assert!(names.contains(&"isolation_forest"));
    assert!(names.contains(&"underperforming_regions"));

    assert!(matches!(report.clustering, ClusteringOutcome::InsufficientRegions));
    assert!(matches!(report.trend, TrendOutcome::InsufficientData { observations: 4, .. }));
    let messages: Vec<&str> = report.notices.iter().map(|n| n.message.as_str()).collect();
    assert!(messages.contains(&"insufficient regions for clustering"));
    assert!(messages.iter().any(|m| m.starts_with("insufficient data")));
}

#[test]
fn test_twelve_region_surge_flagged_by_every_detector() {
    let tables = monthly_tables(&twelve_region_profiles(), 4);
    let report = Analyzer::new(AnalysisConfig::default()).run(&tables).unwrap();

    assert_eq!(report.metrics.len(), 12);
    assert_eq!(flagged_by(&report, "z_score", Metric::TotalBio), vec!["Z"]);
    assert_eq!(flagged_by(&report, "iqr", Metric::TotalBio), vec!["Z"]);
    assert!(flagged_by(&report, "z_score", Metric::TotalDemo).is_empty());
    assert!(flagged_by(&report, "iqr", Metric::TotalDemo).is_empty());

    let update: Vec<&str> = report.ratios.update_enroll.iter().map(|f| f.region.as_str()).collect();
    assert_eq!(update, vec!["Z"]);
    let bio_demo: Vec<&str> = report.ratios.bio_demo.iter().map(|f| f.region.as_str()).collect();
    assert_eq!(bio_demo, vec!["Z"]);

    let flagged = report.anomalies.as_ref().unwrap().flagged();
    assert_eq!(flagged.len(), 2);
    assert_eq!(flagged[0].region, "Z");

    assert!(matches!(report.clustering, ClusteringOutcome::Clustered(_)));

    let names = detectors(&report);
    for expected in ["z_score", "iqr", "update_enroll_ratio", "bio_demo_ratio", "isolation_forest"] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[test]
fn test_findings_grouped_by_stage() {
    let tables = monthly_tables(&twelve_region_profiles(), 4);
    let report = Analyzer::new(AnalysisConfig::default()).run(&tables).unwrap();

    let stages: Vec<Stage> = report.findings.iter().map(|f| f.stage()).collect();
    assert!(stages.windows(2).all(|w| w[0] <= w[1]));
    assert!(report.notices.windows(2).all(|w| w[0].stage <= w[1].stage));
}

#[test]
fn test_quality_problems_reported_first() {
    let mut tables = monthly_tables(&three_region_profiles(), 4);
    let mut null_region = Row::new("B", "B-d1", &mid_month(1), &[1, 1]);
    null_region.region = None;
    let dirty = vec![
        Row::new("C", "C-d2", &mid_month(2), &[-5, 10]),
        Row::new("C", "C-d2", &mid_month(3), &[3, 3]),
        Row::new("C", "C-d2", &mid_month(3), &[3, 3]),
        null_region,
    ];
    tables.push(RawTable::new(
        DatasetKind::Biometric,
        vec![batch(DatasetKind::Biometric, &dirty)],
    ));

    let report = Analyzer::new(AnalysisConfig::default()).run(&tables).unwrap();

    assert_eq!(report.quality.len(), 4);
    let dirty_profile = &report.quality[3];
    assert_eq!(dirty_profile.duplicate_rows, 1);
    assert_eq!(dirty_profile.missing_regions, 1);
    assert_eq!(dirty_profile.negative_values.get("bio_age_5_17"), Some(&1));

    let first = &report.findings[0];
    assert_eq!(first.stage(), Stage::Quality);
    assert!(
        report
            .findings_in(Stage::Quality)
            .any(|f| f.severity() == Severity::High && f.description().contains("negative"))
    );
    // dirty rows are merged into the biometric totals
    assert_eq!(report.metrics.get("C").unwrap().total_bio, 400.0 + 5.0 + 12.0);
}

#[test]
fn test_trend_forecast_on_long_series() {
    let rows: Vec<Row> = (0..24_i64)
        .map(|i| {
            let month = (i % 12) as u32 + 1;
            let year = 2023 + i / 12;
            let level = 1000 + 40 * i + (i * 37 % 11) * 15;
            Row::new("A", "A-d1", &format!("10-{month:02}-{year}"), &[level / 4, level - level / 4])
        })
        .collect();
    let tables = vec![RawTable::new(
        DatasetKind::Biometric,
        vec![batch(DatasetKind::Biometric, &rows)],
    )];

    let report = Analyzer::new(AnalysisConfig::default()).run(&tables).unwrap();

    match &report.trend {
        TrendOutcome::Forecast(trend) => {
            assert_eq!(trend.observations, 24);
            assert_eq!(trend.forecast.len(), 6);
            assert_eq!(trend.forecast[0].period, YearMonth::new(2025, 1).unwrap());
            assert!(trend.forecast.iter().all(|p| p.lower <= p.estimate && p.estimate <= p.upper));
        }
        TrendOutcome::NoSuitableModel { .. } => {
            assert!(report.notices.iter().any(|n| n.message == "no suitable model found"));
        }
        TrendOutcome::InsufficientData { .. } => panic!("24 months should be enough"),
    }
}

#[test]
fn test_missing_count_column_is_an_error() {
    let batch = arrow::record_batch::RecordBatch::try_from_iter(vec![(
        "state",
        std::sync::Arc::new(arrow::array::StringArray::from(vec!["A"])) as arrow::array::ArrayRef,
    )])
    .unwrap();
    let tables = vec![RawTable::new(DatasetKind::Enrollment, vec![batch])];

    let err = Analyzer::new(AnalysisConfig::default()).run(&tables).unwrap_err();
    assert!(matches!(err, AnalysisError::ColumnNotFound { .. }));
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = AnalysisConfig::default();
    config.anomaly.contamination = 0.9;
    let err = Analyzer::new(config).run(&[]).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig(_)));
}

#[test]
fn test_empty_input_degrades_to_notices() {
    let report = Analyzer::new(AnalysisConfig::default()).run(&[]).unwrap();
    assert!(report.metrics.is_empty());
    assert!(report.findings.is_empty());
    assert!(report.anomalies.is_none());
    assert!(!report.notices.is_empty());
    assert!(report.summary().contains("Regions analysed: 0"));
}
