use crate::error::ConfigError;
use chrono::NaiveDate;
use core_types::{
    DifferenceVariance, EstimationWindowSpec, EventWindowSpec, VarianceConvention,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub study: StudyConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Contains the parameters of a single event study.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyConfig {
    /// The broad-market proxy every asset is regressed on (e.g., "SPY").
    pub market_ticker: String,
    /// The instruments under study, in report order.
    pub asset_tickers: Vec<String>,
    pub estimation: EstimationWindowSpec,
    pub event: EventWindowSpec,
    /// Trading days that must separate the estimation window from the event window.
    #[serde(default)]
    pub gap: usize,
    #[serde(default)]
    pub variance_convention: VarianceConvention,
    #[serde(default)]
    pub difference_variance: DifferenceVariance,
    #[serde(default = "default_min_panel_rows")]
    pub min_panel_rows: usize,
    /// Asset pairs for the difference test. Every pair is compared when omitted.
    #[serde(default)]
    pub comparisons: Option<Vec<(String, String)>>,
}

/// Where price histories come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// A long-format CSV file with date, ticker and close columns.
    Csv,
    /// The Yahoo Finance chart API.
    Yahoo,
}

/// Contains the parameters for fetching price histories.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub source: DataSource,
    /// Required when `source = "csv"`.
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
    /// Overrides the Yahoo endpoint, mainly for proxies.
    #[serde(default)]
    pub yahoo_base_url: Option<String>,
    /// First calendar date to fetch. Must precede the estimation window by at
    /// least one trading day, since the first price yields no return.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Contains the parameters for the tracing subscriber.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily-rolling file here.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

fn default_min_panel_rows() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file_prefix() -> String {
    "event-study.log".to_string()
}

impl Config {
    /// Checks the cross-field rules serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.study.validate()?;
        self.data.validate()
    }
}

impl StudyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.market_ticker.trim().is_empty() {
            return invalid("study.market_ticker must not be empty".to_string());
        }
        if self.asset_tickers.is_empty() {
            return invalid("study.asset_tickers must name at least one asset".to_string());
        }

        let mut seen = HashSet::new();
        for ticker in &self.asset_tickers {
            if ticker.trim().is_empty() {
                return invalid("study.asset_tickers contains an empty ticker".to_string());
            }
            if ticker == &self.market_ticker {
                return invalid(format!("{ticker} is the market ticker and cannot also be an asset"));
            }
            if !seen.insert(ticker.as_str()) {
                return invalid(format!("{ticker} is listed twice in study.asset_tickers"));
            }
        }

        if let Some(pairs) = &self.comparisons {
            for (left, right) in pairs {
                for ticker in [left, right] {
                    if !seen.contains(ticker.as_str()) {
                        return invalid(format!("comparison names unknown asset {ticker}"));
                    }
                }
                if left == right {
                    return invalid(format!("comparison of {left} with itself"));
                }
            }
        }

        if let EstimationWindowSpec::Dates { start, end } = self.estimation {
            if start > end {
                return invalid(format!("estimation window starts {start} after it ends {end}"));
            }
            if end >= self.event.anchor_date() {
                return invalid(format!(
                    "estimation window must end before the event window ({end} >= {})",
                    self.event.anchor_date()
                ));
            }
        }
        if let EventWindowSpec::Dates { start, end } = self.event {
            if start > end {
                return invalid(format!("event window starts {start} after it ends {end}"));
            }
        }

        Ok(())
    }

    /// The asset pairs to run the difference test on.
    pub fn comparison_pairs(&self) -> Vec<(String, String)> {
        match &self.comparisons {
            Some(pairs) => pairs.clone(),
            None => self
                .asset_tickers
                .iter()
                .enumerate()
                .flat_map(|(i, left)| {
                    self.asset_tickers[i + 1..]
                        .iter()
                        .map(move |right| (left.clone(), right.clone()))
                })
                .collect(),
        }
    }

    /// Market first, then assets: the order prices are fetched and aligned in.
    pub fn all_tickers(&self) -> Vec<String> {
        std::iter::once(self.market_ticker.clone())
            .chain(self.asset_tickers.iter().cloned())
            .collect()
    }
}

impl DataConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.start_date >= self.end_date {
            return Err(ConfigError::ValidationError(format!(
                "data.start_date {} must be before data.end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.source == DataSource::Csv && self.csv_path.is_none() {
            return Err(ConfigError::ValidationError(
                "data.csv_path is required when data.source = \"csv\"".to_string(),
            ));
        }
        Ok(())
    }
}
