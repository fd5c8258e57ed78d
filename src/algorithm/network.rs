//! Region similarity network
//!
//! Regions are linked when their standardized volume profiles correlate
//! strongly. Centralities use the normalizations common in graph libraries
//! so the numbers are comparable across tools.

use std::collections::VecDeque;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::models::{Metric, MetricTable};
use crate::utils::stats::{mean, pearson, sample_std};

/// Features compared between regions
pub const NETWORK_FEATURES: [Metric; 3] = [Metric::TotalBio, Metric::TotalDemo, Metric::TotalEnroll];

/// Centrality of one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionNode {
    /// Region identifier
    pub region: String,
    /// Number of neighbours
    pub degree: usize,
    /// `degree / (n - 1)`
    pub degree_centrality: f64,
    /// Closeness scaled by the reachable fraction
    pub closeness: f64,
    /// Normalized shortest-path betweenness
    pub betweenness: f64,
}

/// An undirected edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    /// First region (table order)
    pub source: String,
    /// Second region
    pub target: String,
    /// Correlation of the two profiles
    pub similarity: f64,
}

/// The network and its centralities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityNetwork {
    /// One node per region in table order
    pub nodes: Vec<RegionNode>,
    /// Edges in table order
    pub edges: Vec<SimilarityEdge>,
}

impl SimilarityNetwork {
    /// Edge count over the maximum possible
    #[must_use]
    pub fn density(&self) -> f64 {
        let n = self.nodes.len();
        if n < 2 {
            0.0
        } else {
            2.0 * self.edges.len() as f64 / (n * (n - 1)) as f64
        }
    }
}

/// Build the network over the table's regions
///
/// Each feature is standardized across regions (sample deviation plus a
/// small constant); regions whose standardized profiles correlate above
/// `threshold` are linked.
#[must_use]
pub fn similarity_network(table: &MetricTable, threshold: f64) -> SimilarityNetwork {
    let n = table.len();
    let columns: Vec<Vec<f64>> = NETWORK_FEATURES
        .iter()
        .map(|&metric| {
            let column = table.column(metric);
            let m = mean(&column).unwrap_or(0.0);
            let sd = sample_std(&column).unwrap_or(0.0) + 1e-8;
            column.iter().map(|v| (v - m) / sd).collect()
        })
        .collect();
    let profiles: Vec<Vec<f64>> = (0..n)
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect();

    let mut adjacency = vec![Vec::new(); n];
    let mut edges = Vec::new();
    for (i, j) in (0..n).tuple_combinations() {
        if let Some(r) = pearson(&profiles[i], &profiles[j]) {
            if r > threshold {
                adjacency[i].push(j);
                adjacency[j].push(i);
                edges.push(SimilarityEdge {
                    source: table.rows()[i].region.clone(),
                    target: table.rows()[j].region.clone(),
                    similarity: r,
                });
            }
        }
    }

    let closeness = closeness_centrality(&adjacency);
    let betweenness = betweenness_centrality(&adjacency);
    let nodes = table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| RegionNode {
            region: row.region.clone(),
            degree: adjacency[i].len(),
            degree_centrality: if n > 1 {
                adjacency[i].len() as f64 / (n - 1) as f64
            } else {
                1.0
            },
            closeness: closeness[i],
            betweenness: betweenness[i],
        })
        .collect();

    SimilarityNetwork { nodes, edges }
}

fn bfs_distances(adjacency: &[Vec<usize>], source: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; adjacency.len()];
    dist[source] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        let d = dist[v].unwrap_or(0);
        for &w in &adjacency[v] {
            if dist[w].is_none() {
                dist[w] = Some(d + 1);
                queue.push_back(w);
            }
        }
    }
    dist
}

/// Closeness with the reachable-fraction correction for disconnected graphs
#[must_use]
pub fn closeness_centrality(adjacency: &[Vec<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    (0..n)
        .map(|u| {
            let dist = bfs_distances(adjacency, u);
            let reachable = dist.iter().flatten().filter(|&&d| d > 0).count() as f64;
            let total: usize = dist.iter().flatten().sum();
            if total > 0 && n > 1 {
                (reachable / total as f64) * (reachable / (n - 1) as f64)
            } else {
                0.0
            }
        })
        .collect()
}

/// Brandes betweenness normalized by `(n - 1)(n - 2)`
#[must_use]
pub fn betweenness_centrality(adjacency: &[Vec<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    let mut centrality = vec![0.0; n];
    for s in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0; n];
        let mut dist: Vec<Option<usize>> = vec![None; n];
        sigma[s] = 1.0;
        dist[s] = Some(0);
        let mut queue = VecDeque::from([s]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = dist[v].unwrap_or(0);
            for &w in &adjacency[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    // each pair was counted from both ends
    let scale = if n > 2 {
        1.0 / ((n - 1) * (n - 2)) as f64
    } else {
        0.0
    };
    centrality.into_iter().map(|c| c * scale).collect()
}
