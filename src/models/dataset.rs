//! Raw dataset types
//!
//! The three record kinds share a region, sub-region and date column and
//! differ only in their age-banded count columns.

use std::fmt;

use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Kind of raw dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Biometric update records
    Biometric,
    /// Demographic update records
    Demographic,
    /// New enrollment records
    Enrollment,
}

impl DatasetKind {
    /// All dataset kinds in canonical order
    pub const ALL: [Self; 3] = [Self::Biometric, Self::Demographic, Self::Enrollment];

    /// Human readable name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Biometric => "biometric",
            Self::Demographic => "demographic",
            Self::Enrollment => "enrollment",
        }
    }

    /// Names of the numeric count columns, youngest band first
    #[must_use]
    pub const fn count_columns(self) -> &'static [&'static str] {
        match self {
            Self::Biometric => &["bio_age_5_17", "bio_age_17_"],
            Self::Demographic => &["demo_age_5_17", "demo_age_17_"],
            Self::Enrollment => &["age_0_5", "age_5_17", "age_18_greater"],
        }
    }

    /// Index in [`DatasetKind::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Biometric => 0,
            Self::Demographic => 1,
            Self::Enrollment => 2,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A loaded but unconverted input table
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Which dataset the batches belong to
    pub kind: DatasetKind,
    /// Record batches in load order
    pub batches: Vec<RecordBatch>,
}

impl RawTable {
    /// Create a table from already loaded batches
    #[must_use]
    pub fn new(kind: DatasetKind, batches: Vec<RecordBatch>) -> Self {
        Self { kind, batches }
    }

    /// Total number of rows across all batches
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

/// One typed input row
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Region identifier (primary grouping key)
    pub region: String,
    /// Sub-region identifier, if present
    pub sub_region: Option<String>,
    /// Record date; `None` when missing or unparseable
    pub date: Option<NaiveDate>,
    /// Category counts in the order of [`DatasetKind::count_columns`]
    pub counts: SmallVec<[f64; 3]>,
}

impl RawRecord {
    /// Sum of all category counts
    #[must_use]
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }
}

/// Typed records of one dataset kind
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Dataset kind
    pub kind: DatasetKind,
    /// Converted rows
    pub records: Vec<RawRecord>,
    /// Rows dropped because the region was null or empty
    pub skipped_rows: usize,
    /// Rows whose date was present but could not be parsed
    pub unparseable_dates: usize,
}

impl Dataset {
    /// Create a dataset directly from records
    #[must_use]
    pub fn from_records(kind: DatasetKind, records: Vec<RawRecord>) -> Self {
        Self {
            kind,
            records,
            skipped_rows: 0,
            unparseable_dates: 0,
        }
    }

    /// Number of converted rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no rows were converted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
