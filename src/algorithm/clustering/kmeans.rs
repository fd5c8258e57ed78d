//! K-means with k-means++ seeding and Lloyd iterations

use rand::prelude::*;

use crate::error::{AnalysisError, Result};
use crate::utils::stats::{mean, population_std, squared_distance};

/// Parameters for one k-means fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansParams {
    /// Number of clusters
    pub k: usize,
    /// Independent restarts; the lowest inertia wins
    pub n_init: usize,
    /// Lloyd iterations per restart
    pub max_iter: usize,
    /// Convergence tolerance relative to the mean feature variance
    pub tolerance: f64,
    /// Base seed; restart `i` uses `seed + i`
    pub seed: u64,
}

/// Result of a k-means fit
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster index per row
    pub labels: Vec<usize>,
    /// Cluster centers
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned center
    pub inertia: f64,
}

/// Fit k-means on a row-major matrix
///
/// # Errors
/// Returns an error if `k` is zero or larger than the number of rows, or no
/// restarts are requested
pub fn fit_kmeans(data: &[Vec<f64>], params: &KMeansParams) -> Result<KMeansFit> {
    if params.k == 0 || params.k > data.len() {
        return Err(AnalysisError::insufficient(format!(
            "cannot form {} clusters from {} rows",
            params.k,
            data.len()
        )));
    }
    if params.n_init == 0 {
        return Err(AnalysisError::invalid_config("n_init must be positive"));
    }

    let tol = params.tolerance * mean_variance(data);
    let mut best: Option<KMeansFit> = None;
    for run in 0..params.n_init {
        let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(run as u64));
        let fit = lloyd(data, init_plus_plus(data, params.k, &mut rng), params.max_iter, tol);
        if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }
    best.ok_or_else(|| AnalysisError::insufficient("k-means produced no fit"))
}

fn mean_variance(data: &[Vec<f64>]) -> f64 {
    let width = data.first().map_or(0, Vec::len);
    let variances: Vec<f64> = (0..width)
        .map(|c| {
            let column: Vec<f64> = data.iter().map(|r| r[c]).collect();
            population_std(&column).map_or(0.0, |sd| sd * sd)
        })
        .collect();
    mean(&variances).unwrap_or(0.0)
}

/// k-means++ seeding: each new center is drawn with probability
/// proportional to its squared distance from the nearest chosen center
fn init_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centers = vec![data[rng.random_range(0..data.len())].clone()];
    let mut nearest: Vec<f64> = data.iter().map(|p| squared_distance(p, &centers[0])).collect();

    while centers.len() < k {
        let total: f64 = nearest.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.random_range(0.0..total);
            let mut acc = 0.0;
            nearest
                .iter()
                .position(|d| {
                    acc += d;
                    acc > target
                })
                .unwrap_or(data.len() - 1)
        } else {
            rng.random_range(0..data.len())
        };
        let center = data[pick].clone();
        for (d, p) in nearest.iter_mut().zip(data) {
            *d = d.min(squared_distance(p, &center));
        }
        centers.push(center);
    }
    centers
}

fn nearest_center(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

fn lloyd(data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, max_iter: usize, tol: f64) -> KMeansFit {
    let k = centroids.len();
    let width = data[0].len();
    let mut labels = vec![0; data.len()];

    for _ in 0..max_iter {
        let mut distances = vec![0.0; data.len()];
        for (i, point) in data.iter().enumerate() {
            (labels[i], distances[i]) = nearest_center(point, &centroids);
        }

        // an empty cluster takes the point farthest from its center
        for cluster in 0..k {
            if labels.contains(&cluster) {
                continue;
            }
            let far = (0..data.len())
                .filter(|&i| labels.iter().filter(|&&l| l == labels[i]).count() > 1)
                .max_by(|&a, &b| distances[a].total_cmp(&distances[b]).then(b.cmp(&a)));
            if let Some(far) = far {
                labels[far] = cluster;
                distances[far] = 0.0;
            }
        }

        let mut sums = vec![vec![0.0; width]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in data.iter().zip(&labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(point) {
                *s += v;
            }
        }
        let updated: Vec<Vec<f64>> = sums
            .into_iter()
            .zip(&counts)
            .zip(&centroids)
            .map(|((sum, &count), old)| {
                if count == 0 {
                    old.clone()
                } else {
                    sum.into_iter().map(|s| s / count as f64).collect()
                }
            })
            .collect();

        let shift: f64 = updated
            .iter()
            .zip(&centroids)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = updated;
        if shift <= tol {
            break;
        }
    }

    let mut inertia = 0.0;
    for (i, point) in data.iter().enumerate() {
        let (label, distance) = nearest_center(point, &centroids);
        labels[i] = label;
        inertia += distance;
    }
    KMeansFit {
        labels,
        centroids,
        inertia,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: usize) -> KMeansParams {
        KMeansParams {
            k,
            n_init: 5,
            max_iter: 100,
            tolerance: 1e-4,
            seed: 42,
        }
    }

    fn blobs() -> Vec<Vec<f64>> {
        let mut data = Vec::new();
        for i in 0..5 {
            let d = i as f64 * 0.1;
            data.push(vec![d, d]);
            data.push(vec![10.0 + d, 10.0 - d]);
        }
        data
    }

    #[test]
    fn test_separates_two_blobs() {
        let data = blobs();
        let fit = fit_kmeans(&data, &params(2)).unwrap();
        for pair in data.chunks(2).zip(fit.labels.chunks(2)) {
            let (_, labels) = pair;
            assert_ne!(labels[0], labels[1]);
        }
        assert!(fit.labels.iter().step_by(2).all(|&l| l == fit.labels[0]));
        assert!(fit.inertia < 1.0);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let data = blobs();
        assert_eq!(fit_kmeans(&data, &params(3)).unwrap(), fit_kmeans(&data, &params(3)).unwrap());
    }

    #[test]
    fn test_rejects_too_many_clusters() {
        assert!(fit_kmeans(&[vec![1.0]], &params(2)).is_err());
    }
}
