use crate::PriceSource;
use crate::error::MarketDataError;
use crate::responses::ChartResponse;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use core_types::PriceSeries;
use serde::Serialize;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// The API rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; event-study/0.1)";

/// Query parameters of the chart endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartQuery<'a> {
    period1: i64,
    period2: i64,
    interval: &'a str,
    include_adjusted_close: bool,
}

/// A `PriceSource` backed by the Yahoo Finance v8 chart API.
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: Option<&str>) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<String, MarketDataError> {
        // period2 is exclusive, so ask for the midnight after `end`.
        let after_end = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| MarketDataError::InvalidData(format!("end date {end} out of range")))?;
        let query = ChartQuery {
            period1: start.and_hms_opt(0, 0, 0).map_or(0, |t| t.and_utc().timestamp()),
            period2: after_end.and_hms_opt(0, 0, 0).map_or(0, |t| t.and_utc().timestamp()),
            interval: "1d",
            include_adjusted_close: true,
        };
        let query_string =
            serde_qs::to_string(&query).map_err(|e| MarketDataError::InvalidData(e.to_string()))?;
        Ok(format!("{}/v8/finance/chart/{}?{}", self.base_url, ticker, query_string))
    }
}

#[async_trait]
impl PriceSource for YahooClient {
    async fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketDataError> {
        let url = self.chart_url(ticker, start, end)?;
        tracing::debug!(ticker, %url, "Requesting chart.");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Errors come back as a chart payload too, so try that first.
        match serde_json::from_str::<ChartResponse>(&text) {
            Ok(chart) => chart.into_price_series(ticker, start, end),
            Err(_) if !status.is_success() => Err(MarketDataError::Upstream(format!(
                "{ticker}: HTTP {status}: {}",
                text.chars().take(200).collect::<String>()
            ))),
            Err(e) => Err(MarketDataError::Deserialization(format!(
                "{ticker}: {e}. Original text: {}",
                text.chars().take(200).collect::<String>()
            ))),
        }
    }
}
