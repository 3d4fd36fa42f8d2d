use crate::PriceSource;
use crate::error::MarketDataError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{PricePoint, PriceSeries};
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads closing prices from a long-format CSV file with `date`, `ticker`
/// and `close` columns. Header names are matched case-insensitively and any
/// other columns are ignored.
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
}

/// Positions of the required columns within a record.
struct Columns {
    date: usize,
    ticker: usize,
    close: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, MarketDataError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| MarketDataError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            date: find("date")?,
            ticker: find("ticker")?,
            close: find("close")?,
        })
    }
}

impl CsvPriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Synchronous read of one ticker's prices. `fetch_prices` runs this on
    /// the blocking pool.
    pub fn read_prices(
        path: &Path,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketDataError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let columns = Columns::locate(rdr.headers()?)?;

        let mut prices = BTreeMap::new();
        for (index, result) in rdr.records().enumerate() {
            let record = result?;
            // Header is line 1.
            let line = index + 2;
            if field(&record, columns.ticker, line)? != ticker {
                continue;
            }

            let raw_date = field(&record, columns.date, line)?;
            let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|e| {
                MarketDataError::InvalidData(format!("line {line}: bad date '{raw_date}': {e}"))
            })?;
            if date < start || date > end {
                continue;
            }

            let raw_close = field(&record, columns.close, line)?;
            let close = Decimal::from_str(raw_close).map_err(|e| {
                MarketDataError::InvalidData(format!("line {line}: bad close '{raw_close}': {e}"))
            })?;

            if prices.insert(date, close).is_some() {
                return Err(MarketDataError::InvalidData(format!(
                    "line {line}: {ticker} has more than one price on {date}"
                )));
            }
        }

        if prices.is_empty() {
            return Err(MarketDataError::NoData {
                ticker: ticker.to_string(),
            });
        }

        tracing::debug!(ticker, rows = prices.len(), path = %path.display(), "Read prices from CSV.");

        let points = prices
            .into_iter()
            .map(|(date, close)| PricePoint::new(date, close))
            .collect();
        Ok(PriceSeries::new(ticker, points)?)
    }
}

fn field<'r>(record: &'r StringRecord, index: usize, line: usize) -> Result<&'r str, MarketDataError> {
    record
        .get(index)
        .ok_or_else(|| MarketDataError::InvalidData(format!("line {line}: too few fields")))
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    async fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketDataError> {
        let path = self.path.clone();
        let ticker = ticker.to_string();
        tokio::task::spawn_blocking(move || Self::read_prices(&path, &ticker, start, end))
            .await
            .map_err(|e| MarketDataError::TaskFailed(e.to_string()))?
    }
}
