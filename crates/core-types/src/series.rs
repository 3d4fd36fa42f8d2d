use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single closing-price observation for one trading date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: Decimal) -> Self {
        Self { date, price }
    }
}

/// A derived per-date quantity: a return, an abnormal return or a cumulative
/// abnormal return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

impl DatedValue {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// The price history of one instrument.
///
/// Dates are strictly increasing (so there are no duplicates) and every
/// price is strictly positive. An empty series is representable; stages that
/// need observations reject it themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, CoreError> {
        let ticker = validate_ticker(ticker.into())?;

        if let Some(bad) = points.iter().find(|p| p.price <= Decimal::ZERO) {
            return Err(CoreError::InvalidInput(
                format!("price series {ticker}"),
                format!("non-positive price {} on {}", bad.price, bad.date),
            ));
        }
        ensure_increasing(&ticker, points.iter().map(|p| p.date))?;

        Ok(Self { ticker, points })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

/// Simple returns of one instrument, keyed by the date each return ends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    ticker: String,
    values: Vec<DatedValue>,
}

impl ReturnSeries {
    pub fn new(ticker: impl Into<String>, values: Vec<DatedValue>) -> Result<Self, CoreError> {
        let ticker = validate_ticker(ticker.into())?;

        if let Some(bad) = values.iter().find(|v| !v.value.is_finite()) {
            return Err(CoreError::InvalidInput(
                format!("return series {ticker}"),
                format!("non-finite return on {}", bad.date),
            ));
        }
        ensure_increasing(&ticker, values.iter().map(|v| v.date))?;

        Ok(Self { ticker, values })
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

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.values.iter().map(|v| v.date)
    }
}

fn validate_ticker(ticker: String) -> Result<String, CoreError> {
    if ticker.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "ticker".to_string(),
            "must not be empty".to_string(),
        ));
    }
    Ok(ticker)
}

fn ensure_increasing(
    ticker: &str,
    dates: impl Iterator<Item = NaiveDate>,
) -> Result<(), CoreError> {
    let mut previous: Option<NaiveDate> = None;
    for date in dates {
        if let Some(prev) = previous {
            if date <= prev {
                return Err(CoreError::InvalidInput(
                    format!("series {ticker}"),
                    format!("dates must be strictly increasing, but {date} follows {prev}"),
                ));
            }
        }
        previous = Some(date);
    }
    Ok(())
}
