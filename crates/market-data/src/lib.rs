use crate::error::MarketDataError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::PriceSeries;

pub mod csv_source;
pub mod error;
pub mod responses;
pub mod yahoo;

// --- Public API ---
pub use csv_source::CsvPriceSource;
pub use responses::ChartResponse;
pub use yahoo::YahooClient;

/// The abstract interface for anything that can supply daily closing prices.
/// The study pipeline only sees this trait, so a local file and a live API
/// can be swapped without touching the analytics.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches the closing prices of `ticker` for every trading day in
    /// `[start, end]`, in ascending date order.
    ///
    /// Returns `MarketDataError::NoData` when the range holds no prices.
    async fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketDataError>;
}
