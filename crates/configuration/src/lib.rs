use crate::error::ConfigError;
use crate::settings::Config;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{DataConfig, DataSource, LoggingConfig, StudyConfig};

/// Prefix of environment variables that override file values, e.g.
/// `EVENT_STUDY__STUDY__MARKET_TICKER=QQQ`.
pub const ENV_PREFIX: &str = "EVENT_STUDY";

/// Loads the application configuration from the `config.toml` file.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Loads, overlays environment overrides onto, and validates a configuration file.
///
/// This function is the primary entry point for this crate. It reads the configuration file,
/// deserializes it into our strongly-typed `Config` struct, and returns it.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment());
    finish(builder)
}

/// Parses configuration from TOML text, with the same overrides and validation.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .add_source(environment());
    finish(builder)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("study.asset_tickers")
        .try_parsing(true)
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.build()?.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(
        market = %config.study.market_ticker,
        assets = ?config.study.asset_tickers,
        "Loaded study configuration."
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::{DifferenceVariance, EstimationWindowSpec, EventWindowSpec, VarianceConvention};

    const BASE: &str = r#"
        [study]
        market_ticker = "SPY"
        asset_tickers = ["XLE", "XLK"]

        [study.estimation]
        kind = "dates"
        start = "2020-01-02"
        end = "2020-05-29"

        [study.event]
        kind = "around_event"
        event_date = "2020-06-15"
        days_before = 5
        days_after = 14

        [data]
        source = "csv"
        csv_path = "data/prices.csv"
        start_date = "2019-12-30"
        end_date = "2020-07-31"
    "#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_a_complete_study() {
        let config = load_config_from_str(BASE).unwrap();
        let study = &config.study;

        assert_eq!(study.market_ticker, "SPY");
        assert_eq!(
            study.estimation,
            EstimationWindowSpec::Dates {
                start: date(2020, 1, 2),
                end: date(2020, 5, 29)
            }
        );
        assert_eq!(
            study.event,
            EventWindowSpec::AroundEvent {
                event_date: date(2020, 6, 15),
                days_before: 5,
                days_after: 14
            }
        );
        assert_eq!(study.gap, 0);
        assert_eq!(study.min_panel_rows, 4);
        assert_eq!(study.variance_convention, VarianceConvention::Population);
        assert_eq!(study.difference_variance, DifferenceVariance::Pooled);
        assert_eq!(config.data.source, DataSource::Csv);
        assert_eq!(config.logging.level, "info");
        assert_eq!(study.all_tickers(), ["SPY", "XLE", "XLK"]);
    }

    #[test]
    fn defaults_to_comparing_every_pair() {
        let toml = BASE.replace(r#"["XLE", "XLK"]"#, r#"["XLE", "XLK", "XLF"]"#);
        let config = load_config_from_str(&toml).unwrap();

        assert_eq!(config.study.comparison_pairs().len(), 3);
        assert_eq!(
            config.study.comparison_pairs()[0],
            ("XLE".to_string(), "XLK".to_string())
        );
    }

    #[test]
    fn reads_explicit_conventions_and_comparisons() {
        let toml = BASE.replace(
            "asset_tickers = [\"XLE\", \"XLK\"]",
            "asset_tickers = [\"XLE\", \"XLK\"]\n\
             variance_convention = \"sample\"\n\
             difference_variance = \"differenced\"\n\
             gap = 2\n\
             comparisons = [[\"XLK\", \"XLE\"]]",
        );
        let config = load_config_from_str(&toml).unwrap();

        assert_eq!(config.study.variance_convention, VarianceConvention::Sample);
        assert_eq!(config.study.difference_variance, DifferenceVariance::Differenced);
        assert_eq!(config.study.gap, 2);
        assert_eq!(
            config.study.comparison_pairs(),
            vec![("XLK".to_string(), "XLE".to_string())]
        );
    }

    #[test]
    fn parses_preceding_estimation_window() {
        let toml = BASE.replace(
            "kind = \"dates\"\n        start = \"2020-01-02\"\n        end = \"2020-05-29\"",
            "kind = \"preceding\"\n        length = 100",
        );
        let config = load_config_from_str(&toml).unwrap();
        assert_eq!(config.study.estimation, EstimationWindowSpec::Preceding { length: 100 });
    }

    #[test]
    fn rejects_market_listed_as_asset() {
        let toml = BASE.replace(r#"["XLE", "XLK"]"#, r#"["XLE", "SPY"]"#);
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn rejects_duplicate_assets() {
        let toml = BASE.replace(r#"["XLE", "XLK"]"#, r#"["XLE", "XLE"]"#);
        assert!(load_config_from_str(&toml).is_err());
    }

    #[test]
    fn rejects_estimation_ending_after_event() {
        let toml = BASE.replace("end = \"2020-05-29\"", "end = \"2020-06-20\"");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("must end before the event window"));
    }

    #[test]
    fn rejects_csv_source_without_path() {
        let toml = BASE.replace("csv_path = \"data/prices.csv\"\n", "");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("csv_path"));
    }

    #[test]
    fn missing_file_is_named() {
        let err = load_config_from(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(p) if p.ends_with("exist.toml")));
    }

    #[test]
    fn rejects_unknown_comparison_ticker() {
        let toml = BASE.replace(
            "asset_tickers = [\"XLE\", \"XLK\"]",
            "asset_tickers = [\"XLE\", \"XLK\"]\ncomparisons = [[\"XLE\", \"QQQ\"]]",
        );
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("QQQ"));
    }

    #[test]
    fn rejects_data_range_that_ends_first() {
        let toml = BASE.replace("end_date = \"2020-07-31\"", "end_date = \"2019-12-30\"");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("data.start_date 2019-12-30 must be before data.end_date 2019-12-30"));
    }

    #[test]
    fn rejects_event_dates_in_reverse() {
        let toml = BASE.replace(
            "kind = \"around_event\"\n        event_date = \"2020-06-15\"\n        days_before = 5\n        days_after = 14",
            "kind = \"dates\"\n        start = \"2020-06-20\"\n        end = \"2020-06-10\"",
        );
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("event window starts 2020-06-20 after it ends 2020-06-10"));
    }

    #[test]
    fn rejects_comparison_with_itself() {
        let toml = BASE.replace(
            "asset_tickers = [\"XLE\", \"XLK\"]",
            "asset_tickers = [\"XLE\", \"XLK\"]\ncomparisons = [[\"XLK\", \"XLK\"]]",
        );
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("comparison of XLK with itself"));
    }

    #[test]
    fn environment_overrides_file_values() {
        // Feed the variables directly so parallel tests never see them.
        let vars: config::Map<String, String> = [
            ("EVENT_STUDY__STUDY__ASSET_TICKERS", "XLE,XLF,XLU"),
            ("EVENT_STUDY__STUDY__GAP", "3"),
            ("EVENT_STUDY__STUDY__MARKET_TICKER", "QQQ"),
            ("UNRELATED__STUDY__GAP", "9"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let builder = config::Config::builder()
            .add_source(config::File::from_str(BASE, config::FileFormat::Toml))
            .add_source(environment().source(Some(vars)));
        let config = finish(builder).unwrap();

        assert_eq!(config.study.market_ticker, "QQQ");
        assert_eq!(config.study.asset_tickers, ["XLE", "XLF", "XLU"]);
        assert_eq!(config.study.gap, 3);
        assert_eq!(config.study.comparison_pairs().len(), 3);
    }
}
