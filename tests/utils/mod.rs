//! Shared fixtures for the integration tests

use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use region_audit::{DatasetKind, RawTable};

/// One input row before it becomes Arrow
#[derive(Debug, Clone)]
pub struct Row {
    pub region: Option<String>,
    pub sub_region: String,
    pub date: String,
    pub counts: Vec<Option<i64>>,
}

impl Row {
    pub fn new(region: &str, sub_region: &str, date: &str, counts: &[i64]) -> Self {
        Self {
            region: Some(region.to_string()),
            sub_region: sub_region.to_string(),
            date: date.to_string(),
            counts: counts.iter().copied().map(Some).collect(),
        }
    }
}

/// Build a record batch with the default column names of `kind`
pub fn batch(kind: DatasetKind, rows: &[Row]) -> RecordBatch {
    let mut columns: Vec<(&str, ArrayRef)> = vec![
        (
            "state",
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.region.clone()).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
        (
            "district",
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.sub_region.clone()).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
        (
            "date",
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.date.clone()).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
    ];
    for (i, &name) in kind.count_columns().iter().enumerate() {
        let values: Vec<Option<i64>> = rows.iter().map(|r| r.counts[i]).collect();
        columns.push((name, Arc::new(Int64Array::from(values)) as ArrayRef));
    }
    RecordBatch::try_from_iter(columns).expect("valid fixture batch")
}

/// Date string for the 15th of a 2025 month
pub fn mid_month(month: u32) -> String {
    format!("15-{month:02}-2025")
}

/// Per-region monthly counts for the three datasets
#[derive(Debug, Clone)]
pub struct RegionProfile {
    pub region: &'static str,
    pub bio: [i64; 2],
    pub demo: [i64; 2],
    pub enroll: [i64; 3],
}

fn profile_rows(
    profiles: &[RegionProfile],
    months: u32,
    counts: impl Fn(&RegionProfile) -> Vec<i64>,
) -> Vec<Row> {
    let mut rows = Vec::new();
    for p in profiles {
        for m in 1..=months {
            rows.push(Row::new(
                p.region,
                &format!("{}-d1", p.region),
                &mid_month(m),
                &counts(p),
            ));
        }
    }
    rows
}

/// Three tables with one row per region, dataset and month
pub fn monthly_tables(profiles: &[RegionProfile], months: u32) -> Vec<RawTable> {
    let bio = profile_rows(profiles, months, |p| p.bio.to_vec());
    let demo = profile_rows(profiles, months, |p| p.demo.to_vec());
    let enroll = profile_rows(profiles, months, |p| p.enroll.to_vec());
    vec![
        RawTable::new(DatasetKind::Biometric, vec![batch(DatasetKind::Biometric, &bio)]),
        RawTable::new(DatasetKind::Demographic, vec![batch(DatasetKind::Demographic, &demo)]),
        RawTable::new(DatasetKind::Enrollment, vec![batch(DatasetKind::Enrollment, &enroll)]),
    ]
}

/// Three regions; `A` has ten times the biometric volume and no enrollment
pub fn three_region_profiles() -> Vec<RegionProfile> {
    vec![
        RegionProfile {
            region: "A",
            bio: [100, 900],
            demo: [50, 150],
            enroll: [0, 0, 0],
        },
        RegionProfile {
            region: "B",
            bio: [10, 90],
            demo: [50, 150],
            enroll: [100, 100, 50],
        },
        RegionProfile {
            region: "C",
            bio: [10, 90],
            demo: [50, 150],
            enroll: [100, 100, 50],
        },
    ]
}

/// Eleven ordinary regions plus `Z`, which has a biometric surge and no enrollment
pub fn twelve_region_profiles() -> Vec<RegionProfile> {
    const NAMES: [&str; 11] = [
        "R01", "R02", "R03", "R04", "R05", "R06", "R07", "R08", "R09", "R10", "R11",
    ];
    let mut profiles: Vec<RegionProfile> = NAMES
        .iter()
        .zip(0_i64..)
        .map(|(&region, i)| {
            let bio = 250 + 25 * i;
            let demo = 200 + 10 * i;
            RegionProfile {
                region,
                bio: [bio / 5, bio - bio / 5],
                demo: [demo / 5, demo - demo / 5],
                enroll: [250, 250, 250],
            }
        })
        .collect();
    profiles.push(RegionProfile {
        region: "Z",
        bio: [1000, 4000],
        demo: [62, 248],
        enroll: [0, 0, 0],
    });
    profiles
}

/// Fresh scratch directory under the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("region_audit_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
