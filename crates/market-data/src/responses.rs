use crate::error::MarketDataError;
use chrono::{DateTime, NaiveDate};
use core_types::{PricePoint, PriceSeries};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use std::collections::BTreeMap;

// Using `#[serde(rename_all = "camelCase")]` to automatically map from JSON camelCase to Rust snake_case.

/// The body of a `GET /v8/finance/chart/{ticker}` request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

/// Represents an error reported inside the chart payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    /// Session timestamps in epoch seconds. Absent when the range is empty.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    /// Seconds east of UTC for the listing exchange.
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
    #[serde(default)]
    pub adjclose: Vec<AdjClose>,
}

/// Halted sessions come back as `null`, hence the options.
#[derive(Debug, Clone, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Converts the payload into a price series restricted to `[start, end]`.
    ///
    /// Adjusted closes are preferred so dividends and splits do not show up as
    /// returns; the raw close is used when the adjusted series is missing.
    /// Sessions with no price are skipped.
    pub fn into_price_series(
        self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketDataError> {
        if let Some(err) = self.chart.error {
            return Err(MarketDataError::Upstream(format!(
                "{ticker}: {} ({})",
                err.description, err.code
            )));
        }

        let result = self
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| MarketDataError::NoData {
                ticker: ticker.to_string(),
            })?;

        let closes = match result.indicators.adjclose.into_iter().next() {
            Some(adj) if !adj.adjclose.is_empty() => adj.adjclose,
            _ => result
                .indicators
                .quote
                .into_iter()
                .next()
                .map(|q| q.close)
                .unwrap_or_default(),
        };

        if closes.len() != result.timestamp.len() {
            return Err(MarketDataError::InvalidData(format!(
                "{ticker}: {} timestamps but {} closes",
                result.timestamp.len(),
                closes.len()
            )));
        }

        let offset = result.meta.gmtoffset;
        let mut prices = BTreeMap::new();
        for (ts, close) in result.timestamp.iter().zip(closes) {
            let Some(close) = close else { continue };
            let date = DateTime::from_timestamp(ts + offset, 0)
                .ok_or_else(|| MarketDataError::InvalidData(format!("{ticker}: bad timestamp {ts}")))?
                .date_naive();
            if date < start || date > end {
                continue;
            }
            let price = Decimal::from_f64(close)
                .ok_or_else(|| MarketDataError::InvalidData(format!("{ticker}: bad close {close}")))?
                .round_dp(6);
            // A live session can repeat the last bar; the later one wins.
            prices.insert(date, price);
        }

        if prices.is_empty() {
            return Err(MarketDataError::NoData {
                ticker: ticker.to_string(),
            });
        }

        let points = prices
            .into_iter()
            .map(|(date, price)| PricePoint::new(date, price))
            .collect();
        Ok(PriceSeries::new(ticker, points)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2024-01-02..05 at 09:30 New York (14:30 UTC), gmtoffset -5h.
    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "SPY", "gmtoffset": -18000 },
                "timestamp": [1704205800, 1704292200, 1704378600, 1704465000],
                "indicators": {
                    "quote": [{ "close": [472.65, 468.79, null, 467.92] }],
                    "adjclose": [{ "adjclose": [466.1, 462.3, null, 461.5] }]
                }
            }],
            "error": null
        }
    }"#;

    fn parse(body: &str) -> ChartResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn prefers_adjusted_closes_and_skips_nulls() {
        let series = parse(BODY)
            .into_price_series("SPY", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();

        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 5)]);
        assert_eq!(series.points()[0].price, Decimal::from_str("466.1").unwrap());
    }

    #[test]
    fn falls_back_to_raw_closes() {
        let body = BODY.replace(r#""adjclose": [{ "adjclose": [466.1, 462.3, null, 461.5] }]"#, r#""adjclose": []"#);
        let series = parse(&body)
            .into_price_series("SPY", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();
        assert_eq!(series.points()[0].price, Decimal::from_str("472.65").unwrap());
    }

    #[test]
    fn restricts_to_requested_range() {
        let series = parse(BODY)
            .into_price_series("SPY", date(2024, 1, 3), date(2024, 1, 4))
            .unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn upstream_errors_are_surfaced() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse(body)
            .into_price_series("NOPE", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Upstream(msg) if msg.contains("delisted")));
    }

    #[test]
    fn empty_range_has_no_data() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"SPY"},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let err = parse(body)
            .into_price_series("SPY", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, MarketDataError::NoData { .. }));
    }
}
