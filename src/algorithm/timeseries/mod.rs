//! Trend extraction and forecasting for monthly totals
//!
//! The series is tested for a unit root (diagnostic only), then every
//! ARIMA order in a bounded grid is fitted in parallel and the lowest AIC
//! wins. The winner forecasts a fixed horizon with confidence intervals.

pub mod arima;
pub mod optimizer;
pub mod stationarity;

use indicatif::ParallelProgressIterator;
use itertools::iproduct;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::TrendConfig;
use crate::models::{DatasetKind, YearMonth};
use crate::utils::logging::{create_progress_bar, finish_progress_bar};

pub use arima::{ArimaModel, ArimaOrder, FitError, Interval};
pub use stationarity::{StationarityTest, adf_test};

/// One forecast period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Forecast month
    pub period: YearMonth,
    /// Point estimate
    pub estimate: f64,
    /// Lower interval bound
    pub lower: f64,
    /// Upper interval bound
    pub upper: f64,
}

/// The selected model and its forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    /// Dataset the series was built from
    pub dataset: DatasetKind,
    /// Length of the monthly series
    pub observations: usize,
    /// Unit-root test, when it could be computed
    pub stationarity: Option<StationarityTest>,
    /// Selected order
    pub order: ArimaOrder,
    /// AIC of the selected model
    pub aic: f64,
    /// Orders tried
    pub candidates_tried: usize,
    /// Orders that produced an admissible fit
    pub candidates_fitted: usize,
    /// Forecast periods in order
    pub forecast: Vec<ForecastPoint>,
    /// Mean of the residuals
    pub residual_mean: f64,
    /// Sample standard deviation of the residuals
    pub residual_std: f64,
}

/// Outcome of the trend analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrendOutcome {
    /// The series is too short to model
    InsufficientData {
        /// Observations available
        observations: usize,
        /// Observations required
        required: usize,
    },
    /// No order in the grid produced an admissible fit
    NoSuitableModel {
        /// Unit-root test, when it could be computed
        stationarity: Option<StationarityTest>,
    },
    /// A model was selected
    Forecast(TrendReport),
}

/// Orders of the search grid in evaluation order
#[must_use]
pub fn order_grid(config: &TrendConfig) -> Vec<ArimaOrder> {
    iproduct!(0..=config.max_p, 0..=config.max_d, 0..=config.max_q)
        .map(|(p, d, q)| ArimaOrder::new(p, d, q))
        .collect()
}

/// Model a monthly series and forecast it
///
/// Never fails: short series and grids without an admissible fit are
/// reported through [`TrendOutcome`].
#[must_use]
pub fn forecast_trend(
    dataset: DatasetKind,
    series: &[(YearMonth, f64)],
    config: &TrendConfig,
    show_progress: bool,
) -> TrendOutcome {
    if series.len() < config.min_observations {
        return TrendOutcome::InsufficientData {
            observations: series.len(),
            required: config.min_observations,
        };
    }
    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();

    let stationarity = adf_test(&values, config.significance);
    if let Some(test) = &stationarity {
        info!(
            "ADF statistic {:.3}, p-value {:.4} ({})",
            test.statistic,
            test.p_value,
            if test.stationary { "stationary" } else { "non-stationary" }
        );
    }

    let grid = order_grid(config);
    let pb = create_progress_bar(grid.len() as u64, "Fitting ARIMA grid", show_progress);
    let fits: Vec<Result<ArimaModel, FitError>> = grid
        .par_iter()
        .progress_with(pb.clone())
        .map(|&order| ArimaModel::fit(&values, order, config.max_iterations))
        .collect();
    finish_progress_bar(&pb, Some("ARIMA grid done"));

    for (order, fit) in grid.iter().zip(&fits) {
        match fit {
            Ok(model) => debug!("{order}: AIC {:.2}", model.aic()),
            Err(e) => debug!("{order} skipped: {e}"),
        }
    }

    let candidates_fitted = fits.iter().filter(|f| f.is_ok()).count();
    let best = fits
        .into_iter()
        .flatten()
        .fold(None::<ArimaModel>, |best, model| match best {
            Some(b) if b.aic() <= model.aic() => Some(b),
            _ => Some(model),
        });
    let Some(model) = best else {
        return TrendOutcome::NoSuitableModel { stationarity };
    };

    info!("Selected {} with AIC {:.2}", model.order(), model.aic());

    let last = series[series.len() - 1].0;
    let forecast = model
        .forecast(config.horizon, config.confidence)
        .into_iter()
        .enumerate()
        .map(|(h, interval)| ForecastPoint {
            period: last.plus(h + 1),
            estimate: interval.estimate,
            lower: interval.lower,
            upper: interval.upper,
        })
        .collect();
    let (residual_mean, residual_std) = model.residual_summary();

    TrendOutcome::Forecast(TrendReport {
        dataset,
        observations: series.len(),
        stationarity,
        order: model.order(),
        aic: model.aic(),
        candidates_tried: grid.len(),
        candidates_fitted,
        forecast,
        residual_mean,
        residual_std,
    })
}
