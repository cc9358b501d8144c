use crate::error::ConfigError;
use chrono::NaiveDate;
use core_types::{CalendarKind, ResetPolicy, ShortfallPolicy};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub index: IndexSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Parameters of the index itself.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSettings {
    /// Selection width N: how many symbols make up the index on each date.
    #[serde(default = "default_constituent_count")]
    pub constituent_count: usize,
    /// First date of the run. The first processable date on or after it becomes inception.
    pub inception_date: NaiveDate,
    /// Last date of the run, inclusive.
    pub end_date: NaiveDate,
    /// Annual risk-free rate used as the Sharpe ratio baseline (0.02 for 2%).
    #[serde(default)]
    pub risk_free_rate: Decimal,
    #[serde(default)]
    pub trading_calendar: CalendarKind,
    /// Dates removed from the `weekdays` calendar.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    #[serde(default)]
    pub shortfall_policy: ShortfallPolicy,
    #[serde(default)]
    pub reset_policy: ResetPolicy,
    /// Index level on the inception date.
    #[serde(default = "default_base_value")]
    pub base_value: Decimal,
}

/// Where raw price observations come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum DataSourceKind {
    /// One `<SYMBOL>.csv` file per symbol in `csv_directory`.
    #[default]
    Csv,
    /// Observations previously ingested into PostgreSQL.
    Database,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSettings {
    #[serde(default)]
    pub source: DataSourceKind,
    #[serde(default = "default_csv_directory")]
    pub csv_directory: PathBuf,
    /// Explicit universe. When empty, every CSV file in `csv_directory` is used.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Upper bound on concurrent per-symbol fetches.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_file")]
    pub file_name: String,
}

impl Config {
    /// Rejects settings the pipeline cannot run with. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let index = &self.index;
        if index.constituent_count == 0 {
            return Err(ConfigError::ValidationError(
                "index.constituent_count must be positive".to_string(),
            ));
        }
        if index.end_date < index.inception_date {
            return Err(ConfigError::ValidationError(format!(
                "index.end_date ({}) is before index.inception_date ({})",
                index.end_date, index.inception_date
            )));
        }
        if index.base_value <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "index.base_value must be positive, got {}",
                index.base_value
            )));
        }
        if index.risk_free_rate <= Decimal::NEGATIVE_ONE {
            return Err(ConfigError::ValidationError(format!(
                "index.risk_free_rate must be greater than -1, got {}",
                index.risk_free_rate
            )));
        }
        if self.data.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "data.max_concurrency must be positive".to_string(),
            ));
        }
        if self.data.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "data.symbols contains an empty symbol".to_string(),
            ));
        }
        Ok(())
    }
}

// --- Default Implementations ---
// These let a user omit whole sections from their toml and still get a working run.

fn default_constituent_count() -> usize {
    100
}

fn default_base_value() -> Decimal {
    Decimal::ONE_HUNDRED
}

fn default_csv_directory() -> PathBuf {
    PathBuf::from("data/prices")
}

fn default_max_concurrency() -> usize {
    8
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "index_tracker.log".to_string()
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            source: DataSourceKind::default(),
            csv_directory: default_csv_directory(),
            symbols: Vec::new(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_output_directory(),
            file_name: default_log_file(),
        }
    }
}
