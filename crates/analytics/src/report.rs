use crate::abnormal::AbnormalReturnSeries;
use crate::car::CarSeries;
use crate::market_model::MarketModel;
use crate::significance::TestResult;
use crate::window::ResolvedWindow;
use chrono::{DateTime, Utc};
use core_types::{DifferenceVariance, VarianceConvention};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the study produced for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetResult {
    pub ticker: String,
    pub model: MarketModel,
    pub abnormal_returns: AbnormalReturnSeries,
    pub car: CarSeries,
    pub test: TestResult,
    pub p_value: Option<f64>, // None if the statistic is not finite
}

/// The two-series test for one pair of assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairComparison {
    pub left: String,
    pub right: String,
    /// `CAR(left) − CAR(right)` at the end of the event window.
    pub car_difference: f64,
    pub test: TestResult,
    pub p_value: Option<f64>,
}

/// The complete, serialisable output of one event-study run.
///
/// This is the final output of the `EventStudyEngine`; nothing in it is
/// mutated after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStudyReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub market_ticker: String,
    pub estimation_window: ResolvedWindow,
    pub event_window: ResolvedWindow,
    pub variance_convention: VarianceConvention,
    pub difference_variance: DifferenceVariance,
    pub assets: Vec<AssetResult>,
    pub comparisons: Vec<PairComparison>,
}

impl EventStudyReport {
    pub fn asset(&self, ticker: &str) -> Option<&AssetResult> {
        self.assets.iter().find(|a| a.ticker == ticker)
    }

    /// Looks a comparison up in the order it was requested.
    pub fn comparison(&self, left: &str, right: &str) -> Option<&PairComparison> {
        self.comparisons
            .iter()
            .find(|c| c.left == left && c.right == right)
    }
}
