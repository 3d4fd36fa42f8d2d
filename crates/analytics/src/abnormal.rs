use crate::error::StudyError;
use crate::market_model::MarketModel;
use crate::panel::ReturnPanel;
use core_types::DatedValue;
use serde::{Deserialize, Serialize};

/// Per-day deviations of one asset from its market-model prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbnormalReturnSeries {
    ticker: String,
    values: Vec<DatedValue>,
}

impl AbnormalReturnSeries {
    /// Applies `model` to the asset in `column` of an event sub-panel.
    ///
    /// `value = asset_return − alpha − beta · market_return`, one row per
    /// event date, in the panel's date order.
    pub fn compute(
        model: &MarketModel,
        event: &ReturnPanel,
        column: usize,
    ) -> Result<Self, StudyError> {
        let (ticker, asset) = event
            .tickers()
            .get(column)
            .zip(event.column(column))
            .ok_or_else(|| StudyError::InvalidInput(format!("no panel column {column}")))?;

        if event.is_empty() {
            return Err(StudyError::InsufficientData {
                context: format!("abnormal returns of {ticker}"),
                required: 1,
                found: 0,
            });
        }

        let values: Vec<DatedValue> = event
            .dates()
            .iter()
            .zip(event.market())
            .zip(asset.iter())
            .map(|((date, m), a)| DatedValue::new(*date, a - model.expected_return(*m)))
            .collect();

        tracing::debug!(ticker = ticker.as_str(), rows = values.len(), "Computed abnormal returns.");

        Ok(Self {
            ticker: ticker.clone(),
            values,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn values(&self) -> &[DatedValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().map(|v| v.value).sum()
    }
}
