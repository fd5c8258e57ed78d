//! Descriptive statistics shared by the detectors
//!
//! All helpers take plain slices and return `None` instead of NaN when a
//! statistic is undefined.

use std::cmp::Ordering;

/// Replace NaN and infinities with zero
#[must_use]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// `numerator / (denominator + 1)`, sanitized to a finite value.
///
/// The +1 keeps zero denominators finite and the ratio monotonic in the true
/// denominator, at the cost of biasing small-denominator ratios toward zero.
#[must_use]
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    finite_or_zero(numerator / (denominator + 1.0))
}

/// Arithmetic mean
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divisor `n`)
#[must_use]
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Sample standard deviation (divisor `n - 1`)
#[must_use]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Copy and sort ascending, NaN last
#[must_use]
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Quantile `q` in `[0, 1]` of sorted data using linear interpolation
#[must_use]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Pearson correlation; `None` when either side has zero variance
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}

/// 1-based ranks with ties sharing their average rank
#[must_use]
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]].total_cmp(&values[order[start]]) == Ordering::Equal {
            end += 1;
        }
        // positions start..end share ranks start+1..=end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        start = end;
    }
    ranks
}

/// Squared Euclidean distance
#[must_use]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Column-wise standardization to zero mean and unit variance.
///
/// Uses the population standard deviation; constant columns get a scale of
/// one so they standardize to all zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    /// Column means
    pub means: Vec<f64>,
    /// Column scales
    pub scales: Vec<f64>,
}

impl Standardizer {
    /// Fit on a row-major matrix; non-finite cells count as zero
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);
        for col in 0..width {
            let column: Vec<f64> = rows.iter().map(|r| finite_or_zero(r[col])).collect();
            let m = mean(&column).unwrap_or(0.0);
            let sd = population_std(&column).unwrap_or(0.0);
            means.push(m);
            scales.push(if sd > f64::EPSILON * m.abs().max(1.0) { sd } else { 1.0 });
        }
        Self { means, scales }
    }

    /// Standardize rows with the fitted parameters
    #[must_use]
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(v, (m, s))| (finite_or_zero(*v) - m) / s)
                    .collect()
            })
            .collect()
    }
}

/// Fit and apply a [`Standardizer`] in one step
#[must_use]
pub fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    Standardizer::fit(rows).transform(rows)
}
