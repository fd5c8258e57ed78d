//! Clustering of regions into behavioral groups
//!
//! K-means is fitted for every candidate K and the K with the best
//! silhouette is kept. Cluster labels are only meaningful within one run.

pub mod kmeans;
pub mod silhouette;

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ClusteringConfig;
use crate::error::Result;
use crate::models::{Metric, MetricTable};
use crate::utils::stats::standardize;

pub use kmeans::{KMeansFit, KMeansParams, fit_kmeans};
pub use silhouette::silhouette_score;

/// Quality of one candidate K
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KCandidate {
    /// Number of clusters
    pub k: usize,
    /// Within-cluster sum of squares
    pub inertia: f64,
    /// Mean silhouette; `None` when the fit collapsed to one cluster
    pub silhouette: Option<f64>,
}

/// One cluster of the selected partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Cluster label
    pub label: usize,
    /// Member regions in table order
    pub members: Vec<String>,
    /// Mean raw value of each feature over the members
    pub feature_means: Vec<(Metric, f64)>,
}

/// The selected partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringReport {
    /// Features clustered on
    pub features: Vec<Metric>,
    /// Every K tried, ascending
    pub candidates: Vec<KCandidate>,
    /// Selected K
    pub k: usize,
    /// Silhouette of the selected K
    pub silhouette: f64,
    /// `(region, label)` in table order; labels numbered by first appearance
    pub assignments: Vec<(String, usize)>,
    /// Per-cluster members and feature means
    pub clusters: Vec<ClusterSummary>,
}

/// Result of clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClusteringOutcome {
    /// Too few regions for any K in range
    InsufficientRegions,
    /// Every candidate collapsed to fewer than two clusters
    NoStructure,
    /// A partition was selected
    Clustered(ClusteringReport),
}

/// Candidate values of K for `n` regions
#[must_use]
pub fn candidate_ks(max_k: usize, n: usize) -> std::ops::RangeInclusive<usize> {
    2..=max_k.min(n / 2)
}

/// Relabel so clusters are numbered in order of first appearance
#[must_use]
pub fn relabel_by_first_appearance(labels: &[usize]) -> Vec<usize> {
    let mut mapping: Vec<Option<usize>> = vec![None; labels.iter().max().map_or(0, |m| m + 1)];
    let mut next = 0;
    labels
        .iter()
        .map(|&label| {
            *mapping[label].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

/// Cluster the regions of the table
///
/// # Errors
/// Returns an error when the k-means parameters are invalid
pub fn cluster_regions(table: &MetricTable, config: &ClusteringConfig) -> Result<ClusteringOutcome> {
    let ks = candidate_ks(config.max_k, table.len());
    if ks.is_empty() {
        return Ok(ClusteringOutcome::InsufficientRegions);
    }

    let raw = table.feature_matrix(&config.features);
    let data = standardize(&raw);

    let fits = ks
        .into_par_iter()
        .map(|k| {
            let params = KMeansParams {
                k,
                n_init: config.n_init,
                max_iter: config.max_iter,
                tolerance: config.tolerance,
                seed: config.seed,
            };
            let fit = fit_kmeans(&data, &params)?;
            let silhouette = silhouette_score(&data, &fit.labels);
            Ok((KCandidate { k, inertia: fit.inertia, silhouette }, fit))
        })
        .collect::<Result<Vec<_>>>()?;

    let best = fits
        .iter()
        .filter_map(|(candidate, fit)| candidate.silhouette.map(|s| (s, candidate.k, fit)))
        .fold(None::<(f64, usize, &KMeansFit)>, |best, cur| match best {
            Some(b) if b.0 >= cur.0 => Some(b),
            _ => Some(cur),
        });
    let Some((silhouette, k, fit)) = best else {
        return Ok(ClusteringOutcome::NoStructure);
    };

    info!("Selected K={k} with silhouette {silhouette:.3}");

    let labels = relabel_by_first_appearance(&fit.labels);
    let n_clusters = labels.iter().max().map_or(0, |m| m + 1);
    let clusters = (0..n_clusters)
        .map(|label| {
            let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == label).collect();
            let feature_means = config
                .features
                .iter()
                .enumerate()
                .map(|(f, &metric)| {
                    let sum: f64 = members.iter().map(|&i| raw[i][f]).sum();
                    (metric, sum / members.len() as f64)
                })
                .collect();
            ClusterSummary {
                label,
                members: members.iter().map(|&i| table.rows()[i].region.clone()).collect(),
                feature_means,
            }
        })
        .collect();

    Ok(ClusteringOutcome::Clustered(ClusteringReport {
        features: config.features.clone(),
        candidates: fits.iter().map(|(c, _)| *c).collect(),
        k,
        silhouette,
        assignments: table
            .rows()
            .iter()
            .zip(&labels)
            .map(|(row, &label)| (row.region.clone(), label))
            .collect(),
        clusters,
    }))
}
