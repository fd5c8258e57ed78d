//! End-to-end analysis run
//!
//! Converts the raw tables, builds the region metric table once and runs
//! every detector over it. Each stage writes into its own part of the
//! report; a stage that cannot produce a result leaves a notice and the
//! run continues.

use std::fmt::Write as _;
use std::time::Instant;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::algorithm::aggregation::{
    aggregate_regions, monthly_totals, region_daily_totals, sub_region_totals,
};
use crate::algorithm::anomaly::{AnomalyReport, score_regions};
use crate::algorithm::clustering::{ClusteringOutcome, cluster_regions};
use crate::algorithm::control_chart::{ControlChart, control_charts};
use crate::algorithm::correlation::{CorrelationReport, analyze_correlations};
use crate::algorithm::demographic::{DemographicReport, segment_regions};
use crate::algorithm::findings::{
    FindingsCollector, anomaly_finding, outlier_finding, ratio_findings,
};
use crate::algorithm::growth::{GrowthReport, analyze_growth};
use crate::algorithm::network::{SimilarityNetwork, similarity_network};
use crate::algorithm::outliers::{IqrDetector, OutlierReport, UnivariateDetector, ZScoreDetector};
use crate::algorithm::quality::{QualityProfile, profile_table};
use crate::algorithm::ratio::{RatioReport, check_ratios};
use crate::algorithm::spatial::{
    SpatialReport, hotspot_scores, sub_region_extremes, underperforming_regions,
};
use crate::algorithm::timeseries::{TrendOutcome, forecast_trend};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::models::{
    Dataset, DatasetKind, Finding, FindingCategory, MetricTable, Notice, RawTable, Severity, Stage,
    convert_table,
};
use crate::utils::logging::{log_stage_complete, log_stage_skipped, log_stage_start};

const TOTAL_STEPS: usize = 7;

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Region metric table
    pub metrics: MetricTable,
    /// Findings ordered by stage
    pub findings: Vec<Finding>,
    /// Sub-analyses that produced no result
    pub notices: Vec<Notice>,
    /// Quality profile per input table
    pub quality: Vec<QualityProfile>,
    /// Monthly forecast of the configured dataset
    pub trend: TrendOutcome,
    /// Month-over-month growth events
    pub growth: Option<GrowthReport>,
    /// Daily control charts
    pub control_charts: Vec<ControlChart>,
    /// One report per univariate detector and metric
    pub outliers: Vec<OutlierReport>,
    /// Isolation forest scores, when the forest could be grown
    pub anomalies: Option<AnomalyReport>,
    /// Ratio rule violations
    pub ratios: RatioReport,
    /// Underperformers, sub-region extremes and hotspots
    pub spatial: SpatialReport,
    /// Behavioral groups
    pub clustering: ClusteringOutcome,
    /// Region similarity graph
    pub network: SimilarityNetwork,
    /// Age-band segmentation
    pub demographic: DemographicReport,
    /// Correlations between category sums
    pub correlations: CorrelationReport,
}

impl AnalysisReport {
    /// Findings raised in one stage
    pub fn findings_in(&self, stage: Stage) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.stage() == stage)
    }

    /// Multi-line human-readable summary
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Regions analysed: {}", self.metrics.len());
        let _ = writeln!(out, "Findings: {}", self.findings.len());
        for (stage, group) in &self.findings.iter().chunk_by(|f| f.stage()) {
            let _ = writeln!(out, "  {stage}: {}", group.count());
        }
        match &self.trend {
            TrendOutcome::Forecast(report) => {
                let _ = writeln!(
                    out,
                    "Trend: {} (AIC {:.1}), {} periods forecast",
                    report.order,
                    report.aic,
                    report.forecast.len()
                );
            }
            TrendOutcome::InsufficientData { observations, required } => {
                let _ = writeln!(out, "Trend: insufficient data ({observations} of {required} months)");
            }
            TrendOutcome::NoSuitableModel { .. } => {
                let _ = writeln!(out, "Trend: no suitable model found");
            }
        }
        if let ClusteringOutcome::Clustered(report) = &self.clustering {
            let _ = writeln!(out, "Clusters: {} (silhouette {:.3})", report.k, report.silhouette);
        }
        if let Some(anomalies) = &self.anomalies {
            let _ = writeln!(out, "Multivariate anomalies: {}", anomalies.flagged().len());
        }
        if !self.notices.is_empty() {
            let _ = writeln!(out, "Notices:");
            for notice in &self.notices {
                let _ = writeln!(out, "  [{}] {}", notice.stage, notice.message);
            }
        }
        out
    }
}

/// Runs the analysis with one configuration
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    /// Create an analyzer
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every stage over the raw tables
    ///
    /// # Arguments
    /// * `tables` - Loaded tables; several tables of one kind are merged
    ///
    /// # Returns
    /// The full report
    ///
    /// # Errors
    /// Returns an error for invalid configuration or tables that break the
    /// column contract. Statistical shortfalls become notices instead.
    pub fn run(&self, tables: &[RawTable]) -> Result<AnalysisReport> {
        let config = &self.config;
        config.validate()?;
        log::info!("Starting analysis of {} tables", tables.len());
        log::debug!("Configuration: {config}");
        let mut collector = FindingsCollector::new();

        // Step 1: conversion and quality
        log::info!("[Step 1/{TOTAL_STEPS}] Converting tables and profiling quality");
        let mut quality = Vec::with_capacity(tables.len());
        let mut datasets: Vec<Dataset> = DatasetKind::ALL
            .iter()
            .map(|&kind| Dataset::from_records(kind, Vec::new()))
            .collect();
        for table in tables {
            let dataset = convert_table(table, &config.columns)?;
            let profile = profile_table(table, &dataset)?;
            collector.extend(profile.to_findings());
            quality.push(profile);

            let merged = &mut datasets[table.kind.index()];
            merged.records.extend(dataset.records);
            merged.skipped_rows += dataset.skipped_rows;
            merged.unparseable_dates += dataset.unparseable_dates;
        }
        let dataset = |kind: DatasetKind| &datasets[kind.index()];

        // Step 2: aggregation
        log::info!("[Step 2/{TOTAL_STEPS}] Aggregating region metrics");
        let metrics = aggregate_regions(&datasets);
        log::info!("Metric table has {} regions", metrics.len());

        // Step 3: trend
        log::info!("[Step 3/{TOTAL_STEPS}] Trend, growth and control charts");
        let started = Instant::now();
        let before = collector.len();
        let trend_data = dataset(config.trend.dataset);
        let series = monthly_totals(trend_data);
        log_stage_start("trend forecasting", series.len());
        let trend = forecast_trend(trend_data.kind, &series, &config.trend, config.show_progress);
        match &trend {
            TrendOutcome::InsufficientData { observations, required } => collector.notice(
                Stage::Trend,
                format!(
                    "insufficient data: {observations} monthly observations of {} data, {required} required",
                    trend_data.kind
                ),
            ),
            TrendOutcome::NoSuitableModel { .. } => {
                collector.notice(Stage::Trend, "no suitable model found");
            }
            TrendOutcome::Forecast(_) => {}
        }

        let growth_data = dataset(config.growth.dataset);
        let growth = if growth_data.records.iter().any(|r| r.date.is_some()) {
            let report = analyze_growth(growth_data, &config.growth);
            collector.extend(report.to_findings());
            Some(report)
        } else {
            collector.notice(
                Stage::Trend,
                format!("no dated {} records for growth analysis", growth_data.kind),
            );
            None
        };

        let daily = region_daily_totals(dataset(DatasetKind::Biometric));
        let charts = control_charts(&metrics, &daily, &config.relations);
        collector.extend(charts.iter().filter_map(ControlChart::to_finding));
        log_stage_complete("trend analysis", collector.len() - before, started.elapsed());

        // Step 4: anomalies
        log::info!("[Step 4/{TOTAL_STEPS}] Univariate and multivariate anomalies");
        let started = Instant::now();
        let before = collector.len();
        log_stage_start("anomaly detection", metrics.len());
        let zscore = ZScoreDetector::new(config.outliers.zscore_threshold);
        let iqr = IqrDetector::new(config.outliers.iqr_multiplier);
        let outliers: Vec<OutlierReport> = config
            .outliers
            .zscore_metrics
            .iter()
            .map(|&m| zscore.detect_metric(&metrics, m))
            .chain(
                config
                    .outliers
                    .iqr_metrics
                    .iter()
                    .map(|&m| iqr.detect_metric(&metrics, m)),
            )
            .collect();
        for report in &outliers {
            if report.is_degenerate() {
                collector.notice(
                    Stage::Anomaly,
                    format!("{}: {} has no spread, no outliers reported", report.detector, report.metric),
                );
            }
        }
        collector.extend(outliers.iter().filter_map(outlier_finding));

        let anomalies = match score_regions(&metrics, &config.anomaly, config.show_progress) {
            Ok(report) => {
                collector.extend(anomaly_finding(&report));
                Some(report)
            }
            Err(e) => {
                log_stage_skipped("isolation forest", &e.to_string());
                collector.notice(Stage::Anomaly, format!("multivariate scoring skipped: {e}"));
                None
            }
        };
        log_stage_complete("anomaly detection", collector.len() - before, started.elapsed());

        // Step 5: ratios
        log::info!("[Step 5/{TOTAL_STEPS}] Ratio checks");
        let ratios = check_ratios(&metrics, &config.ratios);
        collector.extend(ratio_findings(&ratios, &config.ratios));

        // Step 6: spatial
        log::info!("[Step 6/{TOTAL_STEPS}] Spatial comparison and clustering");
        let started = Instant::now();
        let before = collector.len();
        let spatial = SpatialReport {
            underperformers: underperforming_regions(&metrics, &config.spatial),
            sub_region_extremes: sub_region_extremes(
                &sub_region_totals(dataset(DatasetKind::Biometric)),
                &config.spatial,
            ),
            hotspots: hotspot_scores(&metrics, &config.spatial),
        };
        collector.extend(spatial.to_findings());

        let clustering = cluster_regions(&metrics, &config.clustering)?;
        match &clustering {
            ClusteringOutcome::InsufficientRegions => {
                collector.notice(Stage::Spatial, "insufficient regions for clustering");
            }
            ClusteringOutcome::NoStructure => {
                collector.notice(Stage::Spatial, "no candidate K produced two or more clusters");
            }
            ClusteringOutcome::Clustered(report) => {
                for cluster in report.clusters.iter().filter(|c| c.members.len() == 1) {
                    collector.push(
                        Finding::new(
                            FindingCategory::Geographic,
                            Severity::Low,
                            Stage::Spatial,
                            "kmeans",
                            format!("{} forms a cluster of its own", cluster.members[0]),
                        )
                        .with_regions(cluster.members.clone(), Vec::new()),
                    );
                }
            }
        }
        let network = similarity_network(&metrics, config.relations.similarity_threshold);
        log_stage_complete("spatial analysis", collector.len() - before, started.elapsed());

        // Step 7: demographics
        log::info!("[Step 7/{TOTAL_STEPS}] Demographic segmentation and correlations");
        let demographic = segment_regions(&metrics, &config.demographic);
        collector.extend(demographic.to_findings());
        let correlations = analyze_correlations(&metrics, config.relations.strong_correlation);

        let (findings, notices) = collector.finish();
        log::info!(
            "Analysis complete: {} findings, {} notices",
            findings.len(),
            notices.len()
        );

        Ok(AnalysisReport {
            metrics,
            findings,
            notices,
            quality,
            trend,
            growth,
            control_charts: charts,
            outliers,
            anomalies,
            ratios,
            spatial,
            clustering,
            network,
            demographic,
            correlations,
        })
    }
}
