use crate::error::StudyError;
use chrono::NaiveDate;
use core_types::ReturnSeries;
use ndarray::{Array2, ArrayView1, s};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Range;

/// Index of the market proxy column in every panel.
pub const MARKET_COLUMN: usize = 0;

/// Returns of the market proxy and every asset, aligned on their common dates.
///
/// `returns` has one row per date and columns ordered `[market, asset₁, …,
/// assetₙ]` exactly as supplied. Dates ascend; dates missing from any input
/// series are excluded, never filled.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnPanel {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    returns: Array2<f64>,
}

impl ReturnPanel {
    /// Inner-joins `market` and `assets` on date.
    ///
    /// Fails with `MisalignedDates` when fewer than `min_rows` dates (and at
    /// least one) are common to every series.
    pub fn build(
        market: &ReturnSeries,
        assets: &[ReturnSeries],
        min_rows: usize,
    ) -> Result<Self, StudyError> {
        if assets.is_empty() {
            return Err(StudyError::InvalidInput(
                "a return panel needs at least one asset series besides the market".to_string(),
            ));
        }

        let series: Vec<&ReturnSeries> = std::iter::once(market).chain(assets.iter()).collect();

        let mut seen = HashSet::new();
        if let Some(dup) = series.iter().find(|s| !seen.insert(s.ticker())) {
            return Err(StudyError::InvalidInput(format!(
                "ticker {} appears more than once in the panel",
                dup.ticker()
            )));
        }

        // Dates are unique within each series, so a date common to all of
        // them is counted exactly once per series.
        let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for s in &series {
            for date in s.dates() {
                *counts.entry(date).or_default() += 1;
            }
        }
        let common: BTreeSet<NaiveDate> = counts
            .into_iter()
            .filter(|(_, count)| *count == series.len())
            .map(|(date, _)| date)
            .collect();

        let required = min_rows.max(1);
        if common.len() < required {
            return Err(StudyError::MisalignedDates(format!(
                "{} dates are common to {} ({} series), need at least {required}",
                common.len(),
                series
                    .iter()
                    .map(|s| s.ticker())
                    .collect::<Vec<_>>()
                    .join(", "),
                series.len(),
            )));
        }

        let mut returns = Array2::zeros((common.len(), series.len()));
        for (mut column, s) in returns.columns_mut().into_iter().zip(&series) {
            let kept = s.values().iter().filter(|v| common.contains(&v.date));
            for (slot, v) in column.iter_mut().zip(kept) {
                *slot = v.value;
            }

            let dropped = s.len() - common.len();
            if dropped > 0 {
                tracing::warn!(
                    ticker = s.ticker(),
                    dropped,
                    "Excluded returns on dates missing from other series."
                );
            }
        }

        tracing::info!(
            rows = returns.nrows(),
            columns = returns.ncols(),
            "Built aligned return panel."
        );

        Ok(Self {
            tickers: series.iter().map(|s| s.ticker().to_string()).collect(),
            dates: common.into_iter().collect(),
            returns,
        })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn market_ticker(&self) -> &str {
        &self.tickers[MARKET_COLUMN]
    }

    pub fn asset_tickers(&self) -> &[String] {
        &self.tickers[MARKET_COLUMN + 1..]
    }

    /// Column index of `ticker`, market included.
    pub fn column_of(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn market(&self) -> ArrayView1<'_, f64> {
        self.returns.column(MARKET_COLUMN)
    }

    pub fn column(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.returns.ncols()).then(|| self.returns.column(index))
    }

    /// A contiguous run of rows, keeping every column.
    pub(crate) fn slice(&self, rows: Range<usize>) -> Self {
        Self {
            tickers: self.tickers.clone(),
            dates: self.dates[rows.clone()].to_vec(),
            returns: self.returns.slice(s![rows, ..]).to_owned(),
        }
    }
}
