use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Divisor used whenever a variance is taken over `n` observations.
///
/// The same convention is used for the market-model residuals, the event
/// window abnormal returns and therefore the test statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceConvention {
    /// Divide by `n`.
    #[default]
    Population,
    /// Divide by `n - 1`.
    Sample,
}

impl VarianceConvention {
    /// Delta degrees of freedom: the divisor is `n - ddof`.
    pub fn ddof(&self) -> f64 {
        match self {
            VarianceConvention::Population => 0.0,
            VarianceConvention::Sample => 1.0,
        }
    }

    /// The smallest number of observations the convention can handle.
    pub fn min_observations(&self) -> usize {
        match self {
            VarianceConvention::Population => 1,
            VarianceConvention::Sample => 2,
        }
    }
}

/// How the two-series test combines the `n·σ²` terms of both instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceVariance {
    /// `(n·σ₁² + n·σ₂²) / 2`.
    #[default]
    Pooled,
    /// `(n·σ₁² − n·σ₂²) / 2`. Not a textbook pooling; kept so published
    /// reference figures computed this way can be reproduced.
    Differenced,
}

impl DifferenceVariance {
    pub fn combine(&self, left: f64, right: f64) -> f64 {
        match self {
            DifferenceVariance::Pooled => left + right,
            DifferenceVariance::Differenced => left - right,
        }
    }
}

/// Which of the two study windows a value or an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Estimation,
    Event,
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKind::Estimation => write!(f, "estimation"),
            WindowKind::Event => write!(f, "event"),
        }
    }
}

/// Where the market model is fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimationWindowSpec {
    /// Every trading day in `[start, end]`.
    Dates { start: NaiveDate, end: NaiveDate },
    /// The `length` trading days that end right before the study gap.
    Preceding { length: usize },
}

/// Where abnormal performance is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventWindowSpec {
    /// Every trading day in `[start, end]`.
    Dates { start: NaiveDate, end: NaiveDate },
    /// `days_before` and `days_after` trading days around the first trading
    /// day on or after `event_date`.
    AroundEvent {
        event_date: NaiveDate,
        days_before: usize,
        days_after: usize,
    },
}

impl EventWindowSpec {
    /// The earliest calendar date the window can start on, used to check that
    /// explicit estimation bounds end before it.
    pub fn anchor_date(&self) -> NaiveDate {
        match self {
            EventWindowSpec::Dates { start, .. } => *start,
            EventWindowSpec::AroundEvent { event_date, .. } => *event_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventions_set_ddof_and_minimum() {
        assert_eq!(VarianceConvention::Population.ddof(), 0.0);
        assert_eq!(VarianceConvention::Sample.ddof(), 1.0);
        assert_eq!(VarianceConvention::Population.min_observations(), 1);
        assert_eq!(VarianceConvention::Sample.min_observations(), 2);
    }

    #[test]
    fn difference_variance_combines_terms() {
        assert_eq!(DifferenceVariance::Pooled.combine(3.0, 1.0), 4.0);
        assert_eq!(DifferenceVariance::Differenced.combine(3.0, 1.0), 2.0);
    }

    #[test]
    fn window_kind_displays_lowercase() {
        assert_eq!(WindowKind::Estimation.to_string(), "estimation");
        assert_eq!(WindowKind::Event.to_string(), "event");
    }
}
