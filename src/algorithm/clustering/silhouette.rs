//! Silhouette coefficient

use crate::utils::stats::squared_distance;

/// Mean silhouette over all points, in `[-1, 1]`
///
/// Points in singleton clusters score zero. Returns `None` unless there are
/// at least two clusters and fewer clusters than points.
#[must_use]
pub fn silhouette_score(data: &[Vec<f64>], labels: &[usize]) -> Option<f64> {
    let n = data.len();
    let n_clusters = labels.iter().max().map_or(0, |m| m + 1);
    let distinct = (0..n_clusters).filter(|c| labels.contains(c)).count();
    if n != labels.len() || distinct < 2 || distinct >= n {
        return None;
    }

    let mut sizes = vec![0usize; n_clusters];
    for &label in labels {
        sizes[label] += 1;
    }

    let total: f64 = (0..n)
        .map(|i| {
            let own = labels[i];
            if sizes[own] <= 1 {
                return 0.0;
            }
            let mut sums = vec![0.0; n_clusters];
            for j in 0..n {
                if i != j {
                    sums[labels[j]] += squared_distance(&data[i], &data[j]).sqrt();
                }
            }
            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..n_clusters)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 { (b - a) / denom } else { 0.0 }
        })
        .sum();

    Some(total / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_separated_is_near_one() {
        let data = vec![vec![0.0], vec![0.1], vec![10.0], vec![10.1]];
        let s = silhouette_score(&data, &[0, 0, 1, 1]).unwrap();
        assert!(s > 0.98);
    }

    #[test]
    fn test_bad_partition_is_negative() {
        let data = vec![vec![0.0], vec![0.1], vec![10.0], vec![10.1]];
        let s = silhouette_score(&data, &[0, 1, 0, 1]).unwrap();
        assert!(s < 0.0);
    }

    #[test]
    fn test_undefined_cases() {
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        assert!(silhouette_score(&data, &[0, 0, 0]).is_none());
        assert!(silhouette_score(&data, &[0, 1, 2]).is_none());
    }
}
