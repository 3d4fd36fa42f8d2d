use crate::abnormal::AbnormalReturnSeries;
use crate::error::StudyError;
use crate::stats;
use core_types::{DatedValue, VarianceConvention};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// The summary statistics a significance test needs from one CAR series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarSummary {
    /// CAR on the last event date.
    pub terminal: f64,
    /// Number of event-window rows.
    pub observations: usize,
    /// Variance of the daily abnormal returns over the event window.
    pub abnormal_variance: f64,
}

/// Running sum of one asset's abnormal returns over the event window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSeries {
    ticker: String,
    values: Vec<DatedValue>,
    abnormal_variance: f64,
}

impl CarSeries {
    /// Accumulates `abnormal` and records its variance under `convention`.
    pub fn accumulate(
        abnormal: &AbnormalReturnSeries,
        convention: VarianceConvention,
    ) -> Result<Self, StudyError> {
        let ticker = abnormal.ticker();
        let context = format!("event window of {ticker}");
        if abnormal.is_empty() {
            return Err(StudyError::InsufficientData {
                context,
                required: 1,
                found: 0,
            });
        }

        let values: Vec<DatedValue> = abnormal
            .values()
            .iter()
            .scan(0.0, |running, v| {
                *running += v.value;
                Some(DatedValue::new(v.date, *running))
            })
            .collect();

        let daily: Array1<f64> = abnormal.values().iter().map(|v| v.value).collect();
        let abnormal_variance = stats::variance(daily.view(), convention, &context)?;

        Ok(Self {
            ticker: ticker.to_string(),
            values,
            abnormal_variance,
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

    /// CAR over the whole event window.
    pub fn terminal(&self) -> f64 {
        self.values.last().map_or(0.0, |v| v.value)
    }

    pub fn abnormal_variance(&self) -> f64 {
        self.abnormal_variance
    }

    pub fn summary(&self) -> CarSummary {
        CarSummary {
            terminal: self.terminal(),
            observations: self.len(),
            abnormal_variance: self.abnormal_variance,
        }
    }
}
