//! Isolation forest
//!
//! Anomalies are isolated by fewer random axis-aligned splits than normal
//! points. Each tree is grown from its own seed derived from the base seed,
//! so trees can be built in parallel and the forest is still reproducible.

use indicatif::{ParallelProgressIterator, ProgressBar};
use rand::prelude::*;
use rand::seq::index::sample;
use rayon::prelude::*;

use crate::error::{AnalysisError, Result};

/// Largest subsample drawn per tree
pub const DEFAULT_MAX_SAMPLES: usize = 256;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Parameters for growing a forest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Subsample size per tree; defaults to `min(256, n)`
    pub max_samples: Option<usize>,
    /// Base seed
    pub seed: u64,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// One isolation tree stored as an arena of nodes; the root is node 0
#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(data: &[Vec<f64>], sample_size: usize, rng: &mut StdRng) -> Self {
        let indices = sample(rng, data.len(), sample_size).into_vec();
        let height_limit = (sample_size as f64).log2().ceil().max(0.0) as usize;
        let mut tree = Self { nodes: Vec::new() };
        tree.build(data, indices, 0, height_limit, rng);
        tree
    }

    fn build(
        &mut self,
        data: &[Vec<f64>],
        indices: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            size: indices.len(),
        });
        if depth >= height_limit || indices.len() <= 1 {
            return id;
        }

        // only features that vary within this node can split it
        let width = data[indices[0]].len();
        let candidates: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|feature| {
                let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(data[i][feature]), hi.max(data[i][feature]))
                });
                (hi > lo).then_some((feature, lo, hi))
            })
            .collect();
        let Some(&(feature, lo, hi)) = candidates.choose(rng) else {
            return id;
        };

        let threshold = rng.random_range(lo..hi);
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&i| data[i][feature] <= threshold);

        let left = self.build(data, left_idx, depth + 1, height_limit, rng);
        let right = self.build(data, right_idx, depth + 1, height_limit, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[node] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[feature] <= threshold { left } else { right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(size),
            }
        }
    }
}

/// Average path length of an unsuccessful binary search tree lookup over
/// `n` points, used to normalize path lengths
#[must_use]
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// A fitted isolation forest
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Grow a forest on a row-major matrix
    ///
    /// # Arguments
    /// * `data` - Rows to fit on; every row must have the same width
    /// * `params` - Forest size, subsample size and seed
    /// * `progress` - Progress bar advanced once per tree
    ///
    /// # Errors
    /// Returns an error with fewer than two rows or zero trees
    pub fn fit(data: &[Vec<f64>], params: &ForestParams, progress: &ProgressBar) -> Result<Self> {
        if data.len() < 2 {
            return Err(AnalysisError::insufficient(format!(
                "isolation forest needs at least 2 rows, got {}",
                data.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(AnalysisError::invalid_config("n_estimators must be positive"));
        }

        let sample_size = params
            .max_samples
            .unwrap_or(DEFAULT_MAX_SAMPLES)
            .clamp(2, data.len());

        let trees = (0..params.n_estimators)
            .into_par_iter()
            .progress_with(progress.clone())
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                IsolationTree::grow(data, sample_size, &mut rng)
            })
            .collect();

        Ok(Self { trees, sample_size })
    }

    /// Number of trees
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether the forest has no trees
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Mean path length of a point over all trees
    #[must_use]
    pub fn mean_path_length(&self, point: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.path_length(point)).sum::<f64>() / self.trees.len() as f64
    }

    /// Anomaly score `2^(-E[h] / c(psi))` per row, in `(0, 1]`; higher is
    /// more anomalous
    #[must_use]
    pub fn score_samples(&self, data: &[Vec<f64>]) -> Vec<f64> {
        let norm = average_path_length(self.sample_size);
        data.par_iter()
            .map(|row| 2f64.powf(-self.mean_path_length(row) / norm))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: u64) -> ForestParams {
        ForestParams {
            n_estimators: 100,
            max_samples: None,
            seed,
        }
    }

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut data: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![(i % 5) as f64 * 0.1, (i % 3) as f64 * 0.1])
            .collect();
        data.push(vec![10.0, -10.0]);
        data
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!(c256 > 10.0 && c256 < 11.0);
    }

    #[test]
    fn test_outlier_scores_highest() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &params(42), &ProgressBar::hidden()).unwrap();
        let scores = forest.score_samples(&data);
        let (argmax, _) = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(argmax, data.len() - 1);
        assert!(scores.iter().all(|s| *s > 0.0 && *s <= 1.0));
    }

    #[test]
    fn test_same_seed_same_scores() {
        let data = cluster_with_outlier();
        let a = IsolationForest::fit(&data, &params(7), &ProgressBar::hidden()).unwrap();
        let b = IsolationForest::fit(&data, &params(7), &ProgressBar::hidden()).unwrap();
        assert_eq!(a.score_samples(&data), b.score_samples(&data));
    }

    #[test]
    fn test_too_few_rows() {
        let err = IsolationForest::fit(&[vec![1.0]], &params(1), &ProgressBar::hidden());
        assert!(err.is_err());
    }
}
