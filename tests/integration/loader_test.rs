use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use region_audit::loader::{find_parquet_files, load_data_dir, load_table};
use region_audit::{AnalysisConfig, Analyzer, DatasetKind};

use crate::utils::{Row, batch, mid_month, monthly_tables, scratch_dir, three_region_profiles};

fn write_batch(path: &Path, batch: &RecordBatch) {
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn test_files_found_in_name_order() {
    let dir = scratch_dir("find_order");
    let sample = batch(
        DatasetKind::Biometric,
        &[Row::new("A", "a", &mid_month(1), &[1, 2])],
    );
    write_batch(&dir.join("b.parquet"), &sample);
    write_batch(&dir.join("a.parquet"), &sample);
    std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let files = find_parquet_files(&dir).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.parquet", "b.parquet"]);

    let table = load_table(&dir, DatasetKind::Biometric).unwrap();
    assert_eq!(table.num_rows(), 2);
}

#[test]
fn test_missing_directory_is_an_error() {
    let dir = std::env::temp_dir().join("region_audit_does_not_exist_42");
    assert!(find_parquet_files(&dir).is_err());
    assert!(load_data_dir(&dir).is_err());
}

#[test]
fn test_loaded_data_matches_in_memory_run() {
    let dir = scratch_dir("data_dir");
    let tables = monthly_tables(&three_region_profiles(), 4);
    for table in &tables {
        let kind_dir = dir.join(table.kind.name());
        std::fs::create_dir_all(&kind_dir).unwrap();
        for (i, b) in table.batches.iter().enumerate() {
            write_batch(&kind_dir.join(format!("part-{i}.parquet")), b);
        }
    }

    let loaded = load_data_dir(&dir).unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(
        loaded.iter().map(|t| t.kind).collect::<Vec<_>>(),
        DatasetKind::ALL.to_vec()
    );

    let analyzer = Analyzer::new(AnalysisConfig::default());
    let from_disk = analyzer.run(&loaded).unwrap();
    let in_memory = analyzer.run(&tables).unwrap();
    assert_eq!(from_disk.metrics, in_memory.metrics);
    assert_eq!(from_disk.findings, in_memory.findings);
}

#[test]
fn test_absent_kind_directory_is_skipped() {
    let dir = scratch_dir("partial_dir");
    let kind_dir = dir.join("enrollment");
    std::fs::create_dir_all(&kind_dir).unwrap();
    write_batch(
        &kind_dir.join("part.parquet"),
        &batch(
            DatasetKind::Enrollment,
            &[Row::new("A", "a", &mid_month(2), &[1, 2, 3])],
        ),
    );

    let loaded = load_data_dir(&dir).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].kind, DatasetKind::Enrollment);
}
