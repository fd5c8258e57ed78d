//! Interquartile-range outlier detection (Tukey fences)

use crate::algorithm::outliers::{Detection, Outlier, UnivariateDetector};
use crate::utils::stats::{quantile_sorted, sorted};

/// Flags values outside `[Q1 - k*IQR, Q3 + k*IQR]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrDetector {
    /// Fence multiplier `k`
    pub multiplier: f64,
}

impl IqrDetector {
    /// Create a detector with the given fence multiplier
    #[must_use]
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }
}

impl Default for IqrDetector {
    fn default() -> Self {
        Self::new(1.5)
    }
}

impl UnivariateDetector for IqrDetector {
    fn name(&self) -> &'static str {
        "iqr"
    }

    fn detect(&self, values: &[f64]) -> Option<Detection> {
        let data = sorted(values);
        let q1 = quantile_sorted(&data, 0.25)?;
        let q3 = quantile_sorted(&data, 0.75)?;
        let iqr = q3 - q1;
        if !iqr.is_finite() || iqr <= 0.0 {
            return None;
        }

        let lower = q1 - self.multiplier * iqr;
        let upper = q3 + self.multiplier * iqr;
        let outliers = values
            .iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let score = if value > upper {
                    (value - q3) / iqr
                } else if value < lower {
                    (q1 - value) / iqr
                } else {
                    return None;
                };
                Some(Outlier { index, value, score })
            })
            .collect();

        Some(Detection {
            lower,
            upper,
            outliers,
        })
    }
}
