use crate::error::StudyError;
use crate::panel::ReturnPanel;
use crate::stats::{self, VARIANCE_EPSILON};
use crate::window::MIN_ESTIMATION_ROWS;
use core_types::VarianceConvention;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// An ordinary-least-squares fit of `asset = alpha + beta · market`.
///
/// Only meaningful for the estimation window it was fit on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketModel {
    alpha: f64,
    beta: f64,
    residual_variance: f64,
    observations: usize,
}

impl MarketModel {
    /// Fits the model for `ticker` from paired market and asset returns.
    ///
    /// `beta = Cov(asset, market) / Var(market)` and
    /// `alpha = mean(asset) − beta · mean(market)`. The residual variance uses
    /// `convention` as its divisor.
    pub fn fit(
        ticker: &str,
        market: ArrayView1<'_, f64>,
        asset: ArrayView1<'_, f64>,
        convention: VarianceConvention,
    ) -> Result<Self, StudyError> {
        if market.len() != asset.len() {
            return Err(StudyError::InvalidInput(format!(
                "market model of {ticker}: {} market returns but {} asset returns",
                market.len(),
                asset.len()
            )));
        }
        let n = market.len();
        let context = format!("market model of {ticker}");
        let (mean_m, mean_a) = match (market.mean(), asset.mean()) {
            (Some(mean_m), Some(mean_a)) if n >= MIN_ESTIMATION_ROWS => (mean_m, mean_a),
            _ => {
                return Err(StudyError::InsufficientData {
                    context,
                    required: MIN_ESTIMATION_ROWS,
                    found: n,
                });
            }
        };

        let market_variance = stats::variance(market, convention, &context)?;
        if market_variance <= VARIANCE_EPSILON {
            return Err(StudyError::DegenerateVariance(format!(
                "market returns are constant over the estimation window of {ticker}"
            )));
        }

        // Cov/Var share a divisor, so it cancels.
        let dm = &market - mean_m;
        let da = &asset - mean_a;
        let beta = dm.dot(&da) / dm.dot(&dm);
        let alpha = mean_a - beta * mean_m;

        let residuals = &asset - &market.mapv(|m| alpha + beta * m);
        let residual_variance = stats::variance(residuals.view(), convention, &context)?;

        tracing::info!(ticker, alpha, beta, residual_variance, n, "Fitted market model.");

        Ok(Self {
            alpha,
            beta,
            residual_variance,
            observations: n,
        })
    }

    /// Fits the model for the asset in `column` of an estimation sub-panel.
    pub fn estimate(
        estimation: &ReturnPanel,
        column: usize,
        convention: VarianceConvention,
    ) -> Result<Self, StudyError> {
        let (ticker, asset) = estimation
            .tickers()
            .get(column)
            .zip(estimation.column(column))
            .ok_or_else(|| StudyError::InvalidInput(format!("no panel column {column}")))?;
        Self::fit(ticker, estimation.market(), asset, convention)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn residual_variance(&self) -> f64 {
        self.residual_variance
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    /// The normal return predicted for a given market return.
    pub fn expected_return(&self, market_return: f64) -> f64 {
        self.alpha + self.beta * market_return
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::aview1;

    const MARKET: [f64; 8] = [0.012, -0.004, 0.007, -0.011, 0.003, 0.009, -0.002, 0.005];

    #[test]
    fn recovers_exact_linear_relationship() {
        let asset: Vec<f64> = MARKET.iter().map(|m| 0.0015 + 1.3 * m).collect();
        let model = MarketModel::fit("XLK", aview1(&MARKET), aview1(asset.as_slice()), VarianceConvention::Population)
            .unwrap();

        assert_relative_eq!(model.alpha(), 0.0015, max_relative = 1e-9);
        assert_relative_eq!(model.beta(), 1.3, max_relative = 1e-9);
        assert_abs_diff_eq!(model.residual_variance(), 0.0, epsilon = 1e-20);
        assert_eq!(model.observations(), MARKET.len());
    }

    #[test]
    fn matches_hand_computed_regression() {
        let market = [1.0, 2.0, 3.0, 4.0];
        let asset = [2.0, 3.0, 5.0, 6.0];
        let model = MarketModel::fit("X", aview1(&market), aview1(&asset), VarianceConvention::Population).unwrap();

        // sxy = 7.0, sxx = 5.0
        assert_relative_eq!(model.beta(), 1.4, max_relative = 1e-12);
        assert_relative_eq!(model.alpha(), 0.5, max_relative = 1e-12);
        // Residuals: 0.1, -0.3, 0.3, -0.1
        assert_relative_eq!(model.residual_variance(), 0.05, max_relative = 1e-12);
        assert_relative_eq!(model.expected_return(2.0), 3.3, max_relative = 1e-12);

        let sample = MarketModel::fit("X", aview1(&market), aview1(&asset), VarianceConvention::Sample).unwrap();
        assert_relative_eq!(sample.residual_variance(), 0.2 / 3.0, max_relative = 1e-12);
        assert_relative_eq!(sample.beta(), model.beta());
    }

    #[test]
    fn constant_market_is_degenerate() {
        let market = [0.01; 5];
        let asset = [0.02, 0.01, 0.00, 0.03, 0.01];
        let err = MarketModel::fit("XLE", aview1(&market), aview1(&asset), VarianceConvention::Population)
            .unwrap_err();

        assert!(matches!(err, StudyError::DegenerateVariance(_)));
        assert!(err.to_string().contains("XLE"));
    }

    #[test]
    fn needs_three_observations() {
        let empty = MarketModel::fit("XLE", aview1(&[]), aview1(&[]), VarianceConvention::Population)
            .unwrap_err();
        assert!(matches!(
            empty,
            StudyError::InsufficientData { required: 3, found: 0, .. }
        ));

        let err = MarketModel::fit("XLE", aview1(&[0.1, 0.2]), aview1(&[0.1, 0.3]), VarianceConvention::Population)
            .unwrap_err();
        assert!(matches!(
            err,
            StudyError::InsufficientData { required: 3, found: 2, .. }
        ));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = MarketModel::fit("XLE", aview1(&[0.1, 0.2, 0.3]), aview1(&[0.1]), VarianceConvention::Population)
            .unwrap_err();
        assert!(matches!(err, StudyError::InvalidInput(_)));
    }
}
