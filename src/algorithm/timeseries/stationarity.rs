//! Augmented Dickey-Fuller unit-root test
//!
//! Regression with a constant, lag order chosen by AIC and MacKinnon's
//! approximate p-value for a single series.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Result of the ADF test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationarityTest {
    /// t-statistic of the lagged level coefficient
    pub statistic: f64,
    /// MacKinnon approximate p-value
    pub p_value: f64,
    /// Lagged differences included
    pub used_lag: usize,
    /// Observations in the final regression
    pub nobs: usize,
    /// `p_value < significance`
    pub stationary: bool,
}

// MacKinnon (1994) response surface, constant-only regression, one series
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038_269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.932_02, -0.127_45, -0.010_368];

/// Approximate p-value of an ADF statistic
#[must_use]
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefs: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let poly = coefs.iter().rev().fold(0.0, |acc, c| acc * statistic + c);
    Normal::new(0.0, 1.0).map_or(f64::NAN, |normal| normal.cdf(poly))
}

struct Ols {
    ssr: f64,
    nobs: usize,
    params: usize,
    beta: DVector<f64>,
    std_errors: DVector<f64>,
}

impl Ols {
    fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * self.params as f64
    }
}

fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<Ols> {
    let (nobs, params) = x.shape();
    if nobs <= params {
        return None;
    }
    let xtx_inv = (x.transpose() * x).try_inverse()?;
    let beta = &xtx_inv * x.transpose() * y;
    let resid = y - x * &beta;
    let ssr = resid.dot(&resid);
    let sigma2 = ssr / (nobs - params) as f64;
    let std_errors = DVector::from_iterator(params, (0..params).map(|i| (sigma2 * xtx_inv[(i, i)]).sqrt()));
    (ssr.is_finite() && ssr > 0.0).then_some(Ols {
        ssr,
        nobs,
        params,
        beta,
        std_errors,
    })
}

/// Regressors `[1, y_{t-1}, dy_{t-1}, ..., dy_{t-lag}]` for rows `start..`
fn design(y: &[f64], dy: &[f64], lag: usize, start: usize) -> (DMatrix<f64>, DVector<f64>) {
    // dy[t] = y[t+1] - y[t]; row for dy[t] uses level y[t]
    let rows: Vec<usize> = (start..dy.len()).collect();
    let cols = 2 + lag;
    let x = DMatrix::from_fn(rows.len(), cols, |r, c| {
        let t = rows[r];
        match c {
            0 => 1.0,
            1 => y[t],
            _ => dy[t - (c - 1)],
        }
    });
    let target = DVector::from_iterator(rows.len(), rows.iter().map(|&t| dy[t]));
    (x, target)
}

/// Run the ADF test on a series
///
/// Returns `None` when the series is too short or the regression is
/// singular (for example a constant series).
#[must_use]
pub fn adf_test(series: &[f64], significance: f64) -> Option<StationarityTest> {
    let n = series.len();
    if n < 6 {
        return None;
    }
    let dy: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let max_lag = ((12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize).min((n / 2).saturating_sub(2));

    // compare lag orders on a common sample
    let best_lag = (0..=max_lag)
        .filter_map(|lag| {
            let (x, target) = design(series, &dy, lag, max_lag);
            ols(&x, &target).map(|fit| (lag, fit.aic()))
        })
        .fold(None::<(usize, f64)>, |best, cur| match best {
            Some(b) if b.1 <= cur.1 => Some(b),
            _ => Some(cur),
        })?
        .0;

    let (x, target) = design(series, &dy, best_lag, best_lag);
    let fit = ols(&x, &target)?;
    let statistic = fit.beta[1] / fit.std_errors[1];
    if !statistic.is_finite() {
        return None;
    }
    let p_value = mackinnon_p_value(statistic);

    Some(StationarityTest {
        statistic,
        p_value,
        used_lag: best_lag,
        nobs: fit.nobs,
        stationary: p_value < significance,
    })
}
