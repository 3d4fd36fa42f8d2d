use crate::car::{CarSeries, CarSummary};
use crate::error::StudyError;
use crate::stats::VARIANCE_EPSILON;
use core_types::DifferenceVariance;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// A CAR this close to zero over a window with no abnormal variance means the
/// model priced the window exactly.
const NEGLIGIBLE_CAR: f64 = 1e-12;

/// A t statistic and the degrees of freedom it should be read against.
///
/// Picking a critical value for a significance level is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub statistic: f64,
    pub degrees_of_freedom: i64,
}

impl TestResult {
    /// Two-sided p-value: Student-t when the degrees of freedom are positive,
    /// the standard normal otherwise.
    pub fn p_value(&self) -> Option<f64> {
        if !self.statistic.is_finite() {
            return None;
        }
        let lower_tail = if self.degrees_of_freedom > 0 {
            StudentsT::new(0.0, 1.0, self.degrees_of_freedom as f64)
                .ok()?
                .cdf(-self.statistic.abs())
        } else {
            Normal::new(0.0, 1.0).ok()?.cdf(-self.statistic.abs())
        };
        Some((2.0 * lower_tail).min(1.0))
    }
}

/// Runs the single-series and two-series CAR tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignificanceTester {
    difference_variance: DifferenceVariance,
}

impl SignificanceTester {
    pub fn new(difference_variance: DifferenceVariance) -> Self {
        Self {
            difference_variance,
        }
    }

    /// Tests one CAR series against zero.
    pub fn single(&self, car: &CarSeries) -> Result<TestResult, StudyError> {
        single_series_test(car.ticker(), &car.summary())
    }

    /// Tests whether two CAR series over the same event window differ.
    pub fn difference(&self, left: &CarSeries, right: &CarSeries) -> Result<TestResult, StudyError> {
        difference_test(
            (left.ticker(), &left.summary()),
            (right.ticker(), &right.summary()),
            self.difference_variance,
        )
    }
}

/// `t = CAR / sqrt(n · σ²)` with `n − 2` degrees of freedom.
pub fn single_series_test(label: &str, car: &CarSummary) -> Result<TestResult, StudyError> {
    let n = car.observations;
    if n == 0 {
        return Err(StudyError::InsufficientData {
            context: format!("CAR test of {label}"),
            required: 1,
            found: 0,
        });
    }
    let degrees_of_freedom = n as i64 - 2;

    let scale = n as f64 * car.abnormal_variance;
    if scale <= VARIANCE_EPSILON {
        if car.terminal.abs() <= NEGLIGIBLE_CAR {
            return Ok(TestResult {
                statistic: 0.0,
                degrees_of_freedom,
            });
        }
        return Err(StudyError::DegenerateVariance(format!(
            "abnormal returns of {label} have no variance over the event window but CAR is {}",
            car.terminal
        )));
    }

    Ok(TestResult {
        statistic: car.terminal / scale.sqrt(),
        degrees_of_freedom,
    })
}

/// `t = (CAR₁ − CAR₂) / (sqrt(V / 2) · sqrt(2 / n))` with `n₁ + n₂ − 4`
/// degrees of freedom, where `V` combines `n·σ₁²` and `n·σ₂²` according to
/// `mode`.
pub fn difference_test(
    (left_label, left): (&str, &CarSummary),
    (right_label, right): (&str, &CarSummary),
    mode: DifferenceVariance,
) -> Result<TestResult, StudyError> {
    if left.observations != right.observations {
        return Err(StudyError::IncomparableWindows {
            left: left_label.to_string(),
            left_len: left.observations,
            right: right_label.to_string(),
            right_len: right.observations,
        });
    }
    let n = left.observations;
    if n == 0 {
        return Err(StudyError::InsufficientData {
            context: format!("CAR difference test of {left_label} and {right_label}"),
            required: 1,
            found: 0,
        });
    }

    let nf = n as f64;
    let combined = mode.combine(nf * left.abnormal_variance, nf * right.abnormal_variance);
    if combined <= VARIANCE_EPSILON {
        return Err(StudyError::DegenerateVariance(format!(
            "combined event-window variance of {left_label} and {right_label} is {combined:e}"
        )));
    }

    let denominator = (combined / 2.0).sqrt() * (2.0 / nf).sqrt();
    let statistic = (left.terminal - right.terminal) / denominator;

    tracing::debug!(
        left = left_label,
        right = right_label,
        statistic,
        ?mode,
        "Computed CAR difference statistic."
    );

    Ok(TestResult {
        statistic,
        degrees_of_freedom: (2 * n) as i64 - 4,
    })
}
