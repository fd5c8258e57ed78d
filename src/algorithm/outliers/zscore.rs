//! Z-score outlier detection

use crate::algorithm::outliers::{Detection, Outlier, UnivariateDetector};
use crate::utils::stats::{mean, population_std};

/// Flags values more than `threshold` population standard deviations from
/// the mean
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreDetector {
    /// Absolute Z-score above which a value is flagged
    pub threshold: f64,
}

impl ZScoreDetector {
    /// Create a detector with the given threshold
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for ZScoreDetector {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl UnivariateDetector for ZScoreDetector {
    fn name(&self) -> &'static str {
        "z_score"
    }

    fn detect(&self, values: &[f64]) -> Option<Detection> {
        let m = mean(values)?;
        let sd = population_std(values)?;
        if !sd.is_finite() || sd <= f64::EPSILON * m.abs().max(1.0) {
            return None;
        }

        let outliers = values
            .iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let score = (value - m).abs() / sd;
                (score > self.threshold).then_some(Outlier { index, value, score })
            })
            .collect();

        Some(Detection {
            lower: m - self.threshold * sd,
            upper: m + self.threshold * sd,
            outliers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_variance_flags_nothing() {
        let detector = ZScoreDetector::default();
        assert!(detector.detect(&[7.0; 12]).is_none());
        assert!(detector.detect(&[]).is_none());
    }

    #[test]
    fn test_flags_extreme_value() {
        let mut values = vec![10.0; 11];
        values.push(100.0);
        let detection = ZScoreDetector::default().detect(&values).unwrap();
        assert_eq!(detection.outliers.len(), 1);
        assert_eq!(detection.outliers[0].index, 11);
        // (n - 1) / sqrt(n - 1) = sqrt(11) for a single spike
        assert!((detection.outliers[0].score - 11f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_symmetric_spikes_both_flagged() {
        let mut values = vec![0.0; 20];
        values[0] = 50.0;
        values[1] = -50.0;
        let detection = ZScoreDetector::default().detect(&values).unwrap();
        let flagged: Vec<usize> = detection.outliers.iter().map(|o| o.index).collect();
        assert_eq!(flagged, vec![0, 1]);
        assert!((detection.lower + detection.upper).abs() < 1e-9);
    }
}
