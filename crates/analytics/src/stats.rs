//! Convention-aware variance shared by the estimator and the accumulator.

use crate::error::StudyError;
use core_types::VarianceConvention;
use ndarray::ArrayView1;

/// Variances at or below this are treated as zero.
pub const VARIANCE_EPSILON: f64 = 1e-18;

/// Mean-centred variance of `values` under `convention`.
pub(crate) fn variance(
    values: ArrayView1<'_, f64>,
    convention: VarianceConvention,
    context: &str,
) -> Result<f64, StudyError> {
    let required = convention.min_observations();
    if values.len() < required {
        return Err(StudyError::InsufficientData {
            context: context.to_string(),
            required,
            found: values.len(),
        });
    }
    Ok(values.var(convention.ddof()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::aview1;

    #[test]
    fn variance_respects_divisor_convention() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let population = variance(aview1(&values), VarianceConvention::Population, "test").unwrap();
        let sample = variance(aview1(&values), VarianceConvention::Sample, "test").unwrap();

        assert_relative_eq!(population, 1.25);
        assert_relative_eq!(sample, 5.0 / 3.0);
    }

    #[test]
    fn sample_variance_needs_two_observations() {
        let err = variance(aview1(&[1.0]), VarianceConvention::Sample, "single row").unwrap_err();
        assert!(matches!(
            err,
            StudyError::InsufficientData { required: 2, found: 1, .. }
        ));
    }

    #[test]
    fn population_variance_of_nothing_is_rejected() {
        let err = variance(aview1(&[]), VarianceConvention::Population, "empty").unwrap_err();
        assert!(matches!(err, StudyError::InsufficientData { required: 1, found: 0, .. }));
    }
}
