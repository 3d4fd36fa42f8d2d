use crate::abnormal::AbnormalReturnSeries;
use crate::car::CarSeries;
use crate::error::StudyError;
use crate::market_model::MarketModel;
use crate::panel::{MARKET_COLUMN, ReturnPanel};
use crate::report::{AssetResult, EventStudyReport, PairComparison};
use crate::returns::simple_returns;
use crate::significance::SignificanceTester;
use crate::window::{self, MIN_ESTIMATION_ROWS, SplitPanel};
use chrono::Utc;
use core_types::{
    DifferenceVariance, EstimationWindowSpec, EventWindowSpec, PriceSeries, ReturnSeries,
    VarianceConvention,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything that shapes a study besides the price data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyParameters {
    pub estimation: EstimationWindowSpec,
    pub event: EventWindowSpec,
    /// Minimum trading days strictly between the two windows.
    pub gap: usize,
    pub variance_convention: VarianceConvention,
    pub difference_variance: DifferenceVariance,
    /// Fewest common dates the aligned panel may have.
    pub min_panel_rows: usize,
}

impl StudyParameters {
    pub fn new(estimation: EstimationWindowSpec, event: EventWindowSpec) -> Self {
        Self {
            estimation,
            event,
            gap: 0,
            variance_convention: VarianceConvention::default(),
            difference_variance: DifferenceVariance::default(),
            min_panel_rows: MIN_ESTIMATION_ROWS + 1,
        }
    }

    pub fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_variance_convention(mut self, convention: VarianceConvention) -> Self {
        self.variance_convention = convention;
        self
    }

    pub fn with_difference_variance(mut self, mode: DifferenceVariance) -> Self {
        self.difference_variance = mode;
        self
    }

    pub fn with_min_panel_rows(mut self, rows: usize) -> Self {
        self.min_panel_rows = rows;
        self
    }
}

/// A stateless orchestrator for the event-study pipeline.
///
/// `run` executes every stage in order. The individual steps are public so a
/// caller can fan `analyze_asset` out across threads and join the results in
/// `assemble`.
#[derive(Debug, Clone)]
pub struct EventStudyEngine {
    params: StudyParameters,
    tester: SignificanceTester,
}

impl EventStudyEngine {
    pub fn new(params: StudyParameters) -> Self {
        let tester = SignificanceTester::new(params.difference_variance);
        Self { params, tester }
    }

    /// The main entry point: runs the whole study on one thread.
    ///
    /// # Arguments
    ///
    /// * `market` - Prices of the market proxy.
    /// * `assets` - Prices of every asset under study, in report order.
    /// * `pairs` - Asset pairs to run the difference test on.
    pub fn run(
        &self,
        market: &PriceSeries,
        assets: &[PriceSeries],
        pairs: &[(String, String)],
    ) -> Result<EventStudyReport, StudyError> {
        let split = self.prepare(market, assets)?;
        let results = split
            .event
            .asset_tickers()
            .iter()
            .map(|ticker| self.analyze_asset(&split, ticker))
            .collect::<Result<Vec<_>, _>>()?;
        self.assemble(&split, results, pairs)
    }

    /// Builds returns, aligns them and splits the panel into windows.
    pub fn prepare(
        &self,
        market: &PriceSeries,
        assets: &[PriceSeries],
    ) -> Result<SplitPanel, StudyError> {
        let market_returns = simple_returns(market)?;
        let asset_returns = assets
            .iter()
            .map(simple_returns)
            .collect::<Result<Vec<ReturnSeries>, _>>()?;

        let panel = ReturnPanel::build(&market_returns, &asset_returns, self.params.min_panel_rows)?;
        window::split(
            &panel,
            &self.params.estimation,
            &self.params.event,
            self.params.gap,
        )
    }

    /// Fits, applies and tests the market model for one asset.
    ///
    /// Reads only the market column and `ticker`'s column of `split`.
    pub fn analyze_asset(&self, split: &SplitPanel, ticker: &str) -> Result<AssetResult, StudyError> {
        let column = split
            .estimation
            .column_of(ticker)
            .filter(|c| *c != MARKET_COLUMN)
            .ok_or_else(|| StudyError::InvalidInput(format!("{ticker} is not an asset in the panel")))?;

        let convention = self.params.variance_convention;
        let model = MarketModel::estimate(&split.estimation, column, convention)?;
        let abnormal_returns = AbnormalReturnSeries::compute(&model, &split.event, column)?;
        let car = CarSeries::accumulate(&abnormal_returns, convention)?;
        let test = self.tester.single(&car)?;

        tracing::info!(
            ticker,
            car = car.terminal(),
            t = test.statistic,
            dof = test.degrees_of_freedom,
            "Tested cumulative abnormal return."
        );

        Ok(AssetResult {
            ticker: ticker.to_string(),
            model,
            abnormal_returns,
            car,
            p_value: test.p_value(),
            test,
        })
    }

    /// Runs the two-series test on two analysed assets.
    pub fn compare(&self, left: &AssetResult, right: &AssetResult) -> Result<PairComparison, StudyError> {
        let test = self.tester.difference(&left.car, &right.car)?;
        Ok(PairComparison {
            left: left.ticker.clone(),
            right: right.ticker.clone(),
            car_difference: left.car.terminal() - right.car.terminal(),
            p_value: test.p_value(),
            test,
        })
    }

    /// Joins per-asset results and runs the requested pairwise tests.
    pub fn assemble(
        &self,
        split: &SplitPanel,
        assets: Vec<AssetResult>,
        pairs: &[(String, String)],
    ) -> Result<EventStudyReport, StudyError> {
        let find = |ticker: &str| {
            assets.iter().find(|a| a.ticker == ticker).ok_or_else(|| {
                StudyError::InvalidInput(format!("no analysed asset named {ticker} to compare"))
            })
        };

        let comparisons = pairs
            .iter()
            .map(|(left, right)| self.compare(find(left.as_str())?, find(right.as_str())?))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EventStudyReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            market_ticker: split.event.market_ticker().to_string(),
            estimation_window: split.estimation_window(),
            event_window: split.event_window(),
            variance_convention: self.params.variance_convention,
            difference_variance: self.params.difference_variance,
            assets,
            comparisons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_defaults() {
        let params = StudyParameters::new(
            EstimationWindowSpec::Preceding { length: 60 },
            EventWindowSpec::AroundEvent {
                event_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                days_before: 2,
                days_after: 10,
            },
        );

        assert_eq!(params.gap, 0);
        assert_eq!(params.min_panel_rows, 4);
        assert_eq!(params.variance_convention, VarianceConvention::Population);
        assert_eq!(params.difference_variance, DifferenceVariance::Pooled);
    }
}
