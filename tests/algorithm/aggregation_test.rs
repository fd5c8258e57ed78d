use region_audit::algorithm::aggregation::{aggregate_regions, monthly_totals, sub_region_totals};
use region_audit::config::ColumnConfig;
use region_audit::models::{Dataset, DatasetKind, Metric, YearMonth, convert_table};

use crate::utils::{Row, batch, monthly_tables, three_region_profiles};

fn convert_all(tables: &[region_audit::RawTable]) -> Vec<Dataset> {
    tables
        .iter()
        .map(|t| convert_table(t, &ColumnConfig::default()).unwrap())
        .collect()
}

#[test]
fn test_region_totals_and_ratios() {
    let datasets = convert_all(&monthly_tables(&three_region_profiles(), 4));
    let table = aggregate_regions(&datasets);

    assert_eq!(table.regions(), vec!["A", "B", "C"]);
    let a = table.get("A").unwrap();
    assert_eq!(a.value(Metric::BioYouth), 400.0);
    assert_eq!(a.value(Metric::BioAdult), 3600.0);
    assert_eq!(a.total_demo, 800.0);
    assert_eq!(a.update_enroll_ratio, 4800.0);
    assert_eq!(a.row_counts, [4, 4, 4]);

    let b = table.get("B").unwrap();
    assert_eq!(b.total_enroll, 1000.0);
    assert!((b.bio_demo_ratio - 400.0 / 801.0).abs() < 1e-12);
    // identical monthly rows have no spread
    assert_eq!(b.categories(DatasetKind::Biometric)[0].std, 0.0);
}

#[test]
fn test_region_missing_from_a_dataset_is_zero_filled() {
    let bio = Dataset::from_records(DatasetKind::Biometric, Vec::new());
    let demo_table = region_audit::RawTable::new(
        DatasetKind::Demographic,
        vec![batch(
            DatasetKind::Demographic,
            &[Row::new("Only", "x", "01-01-2025", &[3, 7])],
        )],
    );
    let demo = convert_table(&demo_table, &ColumnConfig::default()).unwrap();
    let table = aggregate_regions(&[bio, demo]);

    let only = table.get("Only").unwrap();
    assert_eq!(only.total_bio, 0.0);
    assert_eq!(only.total_enroll, 0.0);
    assert_eq!(only.total_demo, 10.0);
    assert_eq!(only.categories(DatasetKind::Enrollment).len(), 3);
    assert_eq!(only.bio_demo_ratio, 0.0);
}

#[test]
fn test_monthly_series_fills_gaps() {
    let rows = vec![
        Row::new("A", "a1", "03-01-2025", &[1, 2]),
        Row::new("B", "b1", "28-01-2025", &[10, 0]),
        Row::new("A", "a1", "01-04-2025", &[5, 5]),
    ];
    let table = region_audit::RawTable::new(
        DatasetKind::Biometric,
        vec![batch(DatasetKind::Biometric, &rows)],
    );
    let dataset = convert_table(&table, &ColumnConfig::default()).unwrap();
    let series = monthly_totals(&dataset);

    let expected = vec![
        (YearMonth::new(2025, 1).unwrap(), 13.0),
        (YearMonth::new(2025, 2).unwrap(), 0.0),
        (YearMonth::new(2025, 3).unwrap(), 0.0),
        (YearMonth::new(2025, 4).unwrap(), 10.0),
    ];
    assert_eq!(series, expected);

    let districts = sub_region_totals(&dataset);
    assert_eq!(districts.len(), 2);
    assert_eq!(districts[0].region, "A");
    assert_eq!(districts[0].total, 13.0);
}
