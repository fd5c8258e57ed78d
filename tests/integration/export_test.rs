use region_audit::export::{
    finding_rows, findings_to_batch, metric_rows, metric_rows_from_batch, metrics_to_batch,
    report_to_json, write_report,
};
use region_audit::{AnalysisConfig, Analyzer};

use crate::utils::{monthly_tables, scratch_dir, three_region_profiles};

fn report() -> region_audit::AnalysisReport {
    let tables = monthly_tables(&three_region_profiles(), 4);
    Analyzer::new(AnalysisConfig::default()).run(&tables).unwrap()
}

#[test]
fn test_metric_batch_layout() {
    let report = report();
    let batch = metrics_to_batch(&report.metrics).unwrap();

    assert_eq!(batch.num_rows(), 3);
    assert_eq!(batch.num_columns(), 18);
    assert!(batch.schema().field_with_name("update_enroll_ratio").is_ok());

    let rows = metric_rows_from_batch(&batch).unwrap();
    assert_eq!(rows, metric_rows(&report.metrics));
    assert_eq!(rows[0].region, "A");
    assert_eq!(rows[0].bio_rows, 4);
}

#[test]
fn test_finding_rows_flatten_regions() {
    let report = report();
    let rows = finding_rows(&report.findings);
    assert_eq!(rows.len(), report.findings.len());

    let forest = rows.iter().find(|r| r.detector == "isolation_forest").unwrap();
    assert_eq!(forest.regions, "A");
    assert_eq!(forest.stage, "anomaly");

    let batch = findings_to_batch(&report.findings).unwrap();
    assert_eq!(batch.num_rows(), report.findings.len());
}

#[test]
fn test_report_written_to_directory() {
    let report = report();
    let dir = scratch_dir("export");
    write_report(&dir, &report).unwrap();

    for name in ["report.json", "region_metrics.parquet", "findings.parquet"] {
        assert!(dir.join(name).is_file(), "{name} missing");
    }
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("report.json")).unwrap()).unwrap();
    assert_eq!(json["findings"].as_array().unwrap().len(), report.findings.len());
    assert_eq!(report_to_json(&report).unwrap(), std::fs::read_to_string(dir.join("report.json")).unwrap());
}
