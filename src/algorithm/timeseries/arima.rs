//! ARIMA(p, d, q) fitted by conditional sum of squares
//!
//! The differenced series is rescaled before optimization so the simplex
//! works on unit-scale data. A constant is estimated only when `d == 0`.
//! Likelihood, AIC and forecasts are reported on the original scale.

use std::fmt;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::algorithm::timeseries::optimizer::NelderMead;
use crate::utils::stats::{mean, population_std, sample_std};

/// Why a candidate model was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// Too few observations left after differencing and lagging
    #[error("need at least {needed} observations, got {got}")]
    TooFewObservations {
        /// Observations required
        needed: usize,
        /// Observations available
        got: usize,
    },

    /// The differenced series is constant
    #[error("differenced series has zero variance")]
    ZeroVariance,

    /// The optimizer ran out of iterations
    #[error("optimizer did not converge in {0} iterations")]
    NotConverged(usize),

    /// AR polynomial has a root on or inside the unit circle
    #[error("autoregressive part is not stationary")]
    NonStationary,

    /// MA polynomial has a root on or inside the unit circle
    #[error("moving-average part is not invertible")]
    NonInvertible,

    /// Likelihood or parameters are not finite
    #[error("fit produced non-finite values")]
    NonFinite,
}

/// Model order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// Autoregressive lags
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// Moving-average lags
    pub q: usize,
}

impl ArimaOrder {
    /// Create an order
    #[must_use]
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Whether the model carries a constant
    #[must_use]
    pub const fn has_constant(self) -> bool {
        self.d == 0
    }

    /// Number of estimated parameters including the innovation variance
    #[must_use]
    pub const fn n_params(self) -> usize {
        self.p + self.q + self.has_constant() as usize + 1
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// A point forecast with its interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Point estimate
    pub estimate: f64,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
}

/// A fitted ARIMA model
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaModel {
    order: ArimaOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    constant: f64,
    center: f64,
    scale: f64,
    sigma2: f64,
    loglik: f64,
    aic: f64,
    scaled: Vec<f64>,
    innovations: Vec<f64>,
    last_levels: Vec<f64>,
}

/// `d`-th difference of a series
#[must_use]
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    (0..d).fold(series.to_vec(), |acc, _| acc.windows(2).map(|w| w[1] - w[0]).collect())
}

/// Whether `1 - c_1 z - ... - c_k z^k` has all roots outside the unit circle
#[must_use]
pub fn is_stationary_polynomial(coefs: &[f64]) -> bool {
    match coefs {
        [] => true,
        [a] => a.abs() < 1.0,
        [a, b] => b + a < 1.0 && b - a < 1.0 && b.abs() < 1.0,
        _ => {
            let k = coefs.len();
            let companion = DMatrix::from_fn(k, k, |r, c| {
                if r == 0 {
                    coefs[c]
                } else if r == c + 1 {
                    1.0
                } else {
                    0.0
                }
            });
            companion
                .complex_eigenvalues()
                .iter()
                .all(|root| root.norm() < 1.0 - 1e-8)
        }
    }
}

/// Innovations of the ARMA recursion on scaled data, zero before `p`
fn css_innovations(z: &[f64], order: ArimaOrder, constant: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut e = vec![0.0; z.len()];
    for t in order.p..z.len() {
        let ar_part: f64 = ar.iter().enumerate().map(|(i, phi)| phi * z[t - 1 - i]).sum();
        let ma_part: f64 = ma
            .iter()
            .enumerate()
            .filter(|(j, _)| t > *j)
            .map(|(j, theta)| theta * e[t - 1 - j])
            .sum();
        e[t] = z[t] - constant - ar_part - ma_part;
    }
    e
}

fn split_params(params: &[f64], order: ArimaOrder) -> (f64, &[f64], &[f64]) {
    let offset = usize::from(order.has_constant());
    let constant = if order.has_constant() { params[0] } else { 0.0 };
    (
        constant,
        &params[offset..offset + order.p],
        &params[offset + order.p..offset + order.p + order.q],
    )
}

impl ArimaModel {
    /// Fit a model to a series
    ///
    /// # Errors
    /// Returns a [`FitError`] when the model cannot be estimated or the
    /// estimate is not admissible
    pub fn fit(series: &[f64], order: ArimaOrder, max_iterations: usize) -> Result<Self, FitError> {
        let w = difference(series, order.d);
        let needed = order.p + order.n_params() + 2;
        if w.len() < needed {
            return Err(FitError::TooFewObservations {
                needed: needed + order.d,
                got: series.len(),
            });
        }

        let (center, scale) = if order.has_constant() {
            (
                mean(&w).ok_or(FitError::ZeroVariance)?,
                population_std(&w).ok_or(FitError::ZeroVariance)?,
            )
        } else {
            let rms = (w.iter().map(|v| v * v).sum::<f64>() / w.len() as f64).sqrt();
            (0.0, rms)
        };
        if !scale.is_finite() || scale <= f64::EPSILON * center.abs().max(1.0) {
            return Err(FitError::ZeroVariance);
        }
        let z: Vec<f64> = w.iter().map(|v| (v - center) / scale).collect();

        let objective = |params: &[f64]| -> f64 {
            let (constant, ar, ma) = split_params(params, order);
            if !is_stationary_polynomial(ar) || !is_stationary_polynomial(&ma.iter().map(|t| -t).collect::<Vec<_>>()) {
                return f64::INFINITY;
            }
            let sse: f64 = css_innovations(&z, order, constant, ar, ma)[order.p..]
                .iter()
                .map(|e| e * e)
                .sum();
            if sse.is_finite() { sse } else { f64::INFINITY }
        };

        let start = vec![0.0; order.n_params() - 1];
        let optimizer = NelderMead {
            max_iterations,
            ..NelderMead::default()
        };
        let minimum = optimizer.minimize(objective, &start);
        if !minimum.converged {
            return Err(FitError::NotConverged(minimum.iterations));
        }
        if !minimum.value.is_finite() || minimum.x.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite);
        }

        let (constant, ar, ma) = split_params(&minimum.x, order);
        if !is_stationary_polynomial(ar) {
            return Err(FitError::NonStationary);
        }
        if !is_stationary_polynomial(&ma.iter().map(|t| -t).collect::<Vec<_>>()) {
            return Err(FitError::NonInvertible);
        }

        let innovations = css_innovations(&z, order, constant, ar, ma);
        let nobs = (z.len() - order.p) as f64;
        let sigma2_scaled = minimum.value / nobs;
        if sigma2_scaled <= 0.0 {
            return Err(FitError::NonFinite);
        }
        let sigma2 = sigma2_scaled * scale * scale;
        let loglik = -nobs / 2.0 * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let aic = -2.0 * loglik + 2.0 * order.n_params() as f64;
        if !aic.is_finite() {
            return Err(FitError::NonFinite);
        }

        let last_levels = (0..order.d)
            .map(|k| difference(series, k).last().copied().unwrap_or(0.0))
            .collect();

        Ok(Self {
            order,
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            constant,
            center,
            scale,
            sigma2,
            loglik,
            aic,
            scaled: z,
            innovations,
            last_levels,
        })
    }

    /// Model order
    #[must_use]
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Akaike information criterion
    #[must_use]
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Conditional log-likelihood
    #[must_use]
    pub fn loglik(&self) -> f64 {
        self.loglik
    }

    /// Innovation variance on the original scale
    #[must_use]
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Autoregressive coefficients
    #[must_use]
    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    /// Moving-average coefficients
    #[must_use]
    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    /// Residuals on the scale of the differenced series
    #[must_use]
    pub fn residuals(&self) -> Vec<f64> {
        self.innovations[self.order.p..]
            .iter()
            .map(|e| e * self.scale)
            .collect()
    }

    /// Mean and sample standard deviation of the residuals
    #[must_use]
    pub fn residual_summary(&self) -> (f64, f64) {
        let residuals = self.residuals();
        (
            mean(&residuals).unwrap_or(0.0),
            sample_std(&residuals).unwrap_or(0.0),
        )
    }

    /// Coefficients of the AR polynomial after folding in the differencing,
    /// as `y_t = sum(c_i * y_{t-i}) + ...`
    fn integrated_ar(&self) -> Vec<f64> {
        // 1 - phi_1 B - ... times (1 - B)^d
        let mut poly: Vec<f64> = std::iter::once(1.0).chain(self.ar.iter().map(|a| -a)).collect();
        for _ in 0..self.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        poly[1..].iter().map(|c| -c).collect()
    }

    /// Psi weights of the integrated model, `psi_0 = 1`
    #[must_use]
    pub fn psi_weights(&self, n: usize) -> Vec<f64> {
        let phi = self.integrated_ar();
        let mut psi = vec![0.0; n];
        for j in 0..n {
            psi[j] = if j == 0 {
                1.0
            } else {
                let theta = self.ma.get(j - 1).copied().unwrap_or(0.0);
                theta
                    + (1..=j.min(phi.len()))
                        .map(|i| phi[i - 1] * psi[j - i])
                        .sum::<f64>()
            };
        }
        psi
    }

    /// Forecast `horizon` steps past the end of the series
    ///
    /// Intervals widen with the cumulative psi-weight variance; `confidence`
    /// is the two-sided coverage, e.g. 0.95.
    #[must_use]
    pub fn forecast(&self, horizon: usize, confidence: f64) -> Vec<Interval> {
        let p = self.order.p;
        let mut z = self.scaled.clone();
        let mut e = self.innovations.clone();
        for _ in 0..horizon {
            let t = z.len();
            let ar_part: f64 = self.ar.iter().enumerate().map(|(i, phi)| phi * z[t - 1 - i]).sum();
            let ma_part: f64 = self
                .ma
                .iter()
                .enumerate()
                .filter(|(j, _)| t > *j && t - 1 - j >= p)
                .map(|(j, theta)| theta * e[t - 1 - j])
                .sum();
            z.push(self.constant + ar_part + ma_part);
            e.push(0.0);
        }

        // back to the differenced scale, then integrate d times
        let mut path: Vec<f64> = z[z.len() - horizon..]
            .iter()
            .map(|v| self.center + self.scale * v)
            .collect();
        for last in self.last_levels.iter().rev() {
            let mut level = *last;
            path = path
                .into_iter()
                .map(|step| {
                    level += step;
                    level
                })
                .collect();
        }

        let z_crit = Normal::new(0.0, 1.0).map_or(1.96, |n| n.inverse_cdf(1.0 - (1.0 - confidence) / 2.0));
        let psi = self.psi_weights(horizon);
        let mut cumulative = 0.0;
        path.into_iter()
            .zip(psi)
            .map(|(estimate, weight)| {
                cumulative += weight * weight;
                let half_width = z_crit * (self.sigma2 * cumulative).sqrt();
                Interval {
                    estimate,
                    lower: estimate - half_width,
                    upper: estimate + half_width,
                }
            })
            .collect()
    }
}
