//! Collection and ordering of findings
//!
//! Components append findings in whatever order they run; the collector
//! orders them by stage when the run is finished. Related findings from
//! different detectors are all kept.

use crate::algorithm::anomaly::AnomalyReport;
use crate::algorithm::outliers::OutlierReport;
use crate::algorithm::ratio::{RatioFlag, RatioReport};
use crate::config::RatioConfig;
use crate::models::{Finding, FindingCategory, Notice, Severity, Stage};

/// Append-only collector for one run
#[derive(Debug, Clone, Default)]
pub struct FindingsCollector {
    findings: Vec<Finding>,
    notices: Vec<Notice>,
}

impl FindingsCollector {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one finding
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Append several findings
    pub fn extend<I: IntoIterator<Item = Finding>>(&mut self, findings: I) {
        self.findings.extend(findings);
    }

    /// Record that a sub-analysis produced no result
    pub fn notice(&mut self, stage: Stage, message: impl Into<String>) {
        let notice = Notice::new(stage, message);
        log::warn!("[{}] {}", notice.stage, notice.message);
        self.notices.push(notice);
    }

    /// Findings collected so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Whether nothing was collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Stable-sort by stage and hand out findings and notices
    #[must_use]
    pub fn finish(mut self) -> (Vec<Finding>, Vec<Notice>) {
        self.findings.sort_by_key(Finding::stage);
        self.notices.sort_by_key(|n| n.stage);
        (self.findings, self.notices)
    }
}

fn region_list<'a, I: Iterator<Item = &'a str>>(regions: I) -> String {
    regions.collect::<Vec<_>>().join(", ")
}

/// Finding for one univariate detector pass, if anything was flagged
#[must_use]
pub fn outlier_finding(report: &OutlierReport) -> Option<Finding> {
    if report.outliers.is_empty() {
        return None;
    }
    let peak = report.outliers.iter().map(|o| o.score).fold(0.0, f64::max);
    let severity = if peak > 3.0 { Severity::High } else { Severity::Medium };
    Some(
        Finding::new(
            FindingCategory::Anomaly,
            severity,
            Stage::Anomaly,
            report.detector.clone(),
            format!(
                "{} outliers in {}: {}",
                report.detector,
                report.metric,
                region_list(report.outliers.iter().map(|o| o.region.as_str()))
            ),
        )
        .with_regions(
            report.outliers.iter().map(|o| o.region.clone()).collect(),
            report.outliers.iter().map(|o| o.value).collect(),
        ),
    )
}

fn ratio_finding(flags: &[RatioFlag], detector: &str, description: String) -> Option<Finding> {
    (!flags.is_empty()).then(|| {
        Finding::new(FindingCategory::Ratio, Severity::High, Stage::Ratio, detector, description)
            .with_regions(
                flags.iter().map(|f| f.region.clone()).collect(),
                flags.iter().map(|f| f.value).collect(),
            )
    })
}

/// Findings for both ratio rules
#[must_use]
pub fn ratio_findings(report: &RatioReport, config: &RatioConfig) -> Vec<Finding> {
    let update = ratio_finding(
        &report.update_enroll,
        "update_enroll_ratio",
        format!(
            "Update-to-enrollment ratio above {}: {}",
            config.max_update_enroll,
            region_list(report.update_enroll.iter().map(|f| f.region.as_str()))
        ),
    );
    let bio_demo = ratio_finding(
        &report.bio_demo,
        "bio_demo_ratio",
        format!(
            "Biometric/demographic ratio outside [{}, {}]: {}",
            config.min_bio_demo,
            config.max_bio_demo,
            region_list(report.bio_demo.iter().map(|f| f.region.as_str()))
        ),
    );
    update.into_iter().chain(bio_demo).collect()
}

/// Finding for the regions flagged by the isolation forest
#[must_use]
pub fn anomaly_finding(report: &AnomalyReport) -> Option<Finding> {
    let flagged = report.flagged();
    if flagged.is_empty() {
        return None;
    }
    Some(
        Finding::new(
            FindingCategory::Anomaly,
            Severity::High,
            Stage::Anomaly,
            "isolation_forest",
            format!(
                "Multivariate anomalies ({:.0}% contamination): {}",
                report.contamination * 100.0,
                region_list(flagged.iter().map(|s| s.region.as_str()))
            ),
        )
        .with_regions(
            flagged.iter().map(|s| s.region.clone()).collect(),
            flagged.iter().map(|s| s.score).collect(),
        ),
    )
}
