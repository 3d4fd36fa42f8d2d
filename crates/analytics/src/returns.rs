use crate::error::StudyError;
use core_types::{DatedValue, PriceSeries, ReturnSeries};
use rust_decimal::prelude::ToPrimitive;

/// Converts a price history into simple (arithmetic) returns.
///
/// `return[i] = price[i] / price[i-1] - 1`, dated on the later of the two
/// prices, so the first date has no return and is dropped.
pub fn simple_returns(prices: &PriceSeries) -> Result<ReturnSeries, StudyError> {
    let ticker = prices.ticker();
    let points = prices.points();
    if points.len() < 2 {
        return Err(StudyError::InsufficientData {
            context: format!("returns of {ticker}"),
            required: 2,
            found: points.len(),
        });
    }

    let values = points
        .windows(2)
        .map(|w| {
            (w[1].price - w[0].price)
                .checked_div(w[0].price)
                .and_then(|r| r.to_f64())
                .map(|value| DatedValue::new(w[1].date, value))
                .ok_or_else(|| {
                    StudyError::InvalidInput(format!(
                        "return of {ticker} on {} cannot be represented",
                        w[1].date
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(ticker, returns = values.len(), "Built simple returns.");
    Ok(ReturnSeries::new(ticker, values)?)
}
