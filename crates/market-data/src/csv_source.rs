use crate::MarketDataSource;
use crate::error::MarketDataError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::PriceObservation;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One row of a per-symbol history file. Numeric columns are kept as text so
/// blanks and `NaN` markers can be told apart from malformed values.
#[derive(Debug, Deserialize)]
struct HistoryRecord {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Close", alias = "adj_close")]
    adjusted_close: Option<String>,
    #[serde(default)]
    shares_outstanding: Option<String>,
    #[serde(default)]
    market_cap: Option<String>,
}

/// Reads end-of-day history from a directory holding one `<SYMBOL>.csv` per symbol.
///
/// Expected header: `date,adjusted_close,shares_outstanding[,market_cap]`. File
/// names are expected to carry normalized symbols (see `normalize_symbol`).
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    directory: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.directory.join(format!("{symbol}.csv"))
    }

    fn parse_history(
        symbol: &str,
        bytes: &[u8],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, MarketDataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut observations = Vec::new();
        for (i, result) in reader.deserialize().enumerate() {
            let record: HistoryRecord = result?;
            if record.date < start || record.date > end {
                continue;
            }
            let row = i as u64 + 1;
            observations.push(PriceObservation {
                symbol: symbol.to_string(),
                date: record.date,
                adjusted_close: parse_decimal(symbol, row, record.adjusted_close.as_deref())?,
                shares_outstanding: parse_decimal(symbol, row, record.shares_outstanding.as_deref())?,
                reported_market_cap: parse_decimal(symbol, row, record.market_cap.as_deref())?,
            });
        }
        observations.sort_by_key(|o| o.date);
        Ok(observations)
    }
}

#[async_trait]
impl MarketDataSource for CsvDirectorySource {
    async fn list_symbols(&self) -> Result<Vec<String>, MarketDataError> {
        let io_err = |source| MarketDataError::Io {
            path: self.directory.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.directory).await.map_err(io_err)?;

        let mut symbols = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, MarketDataError> {
        let path = self.path_for(symbol);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(source) => return Err(MarketDataError::Io { path, source }),
        };

        let observations = Self::parse_history(symbol, &bytes, start, end)?;
        if observations.is_empty() {
            return Err(MarketDataError::NoData(symbol.to_string()));
        }
        tracing::debug!(symbol, rows = observations.len(), "Loaded price history");
        Ok(observations)
    }
}

/// Blank cells and the usual missing-value markers become `None`.
fn parse_decimal(symbol: &str, row: u64, raw: Option<&str>) -> Result<Option<Decimal>, MarketDataError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if raw.is_empty() || ["nan", "null", "none", "n/a"].contains(&raw.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map(Some)
        .map_err(|e| MarketDataError::Parse {
            symbol: symbol.to_string(),
            row,
            message: format!("'{raw}': {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn parses_rows_within_range() {
        let csv = "date,adjusted_close,shares_outstanding,market_cap\n\
                   2024-01-03,185.64,15441900000,\n\
                   2024-01-02,184.25,15441900000,\n\
                   2024-01-10,186.00,15441900000,\n";
        let rows = CsvDirectorySource::parse_history("AAPL", csv.as_bytes(), day(1), day(5)).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day(2));
        assert_eq!(rows[0].adjusted_close, Some(dec!(184.25)));
        assert_eq!(rows[1].market_cap(), Some(dec!(185.64) * dec!(15441900000)));
        assert_eq!(rows[1].reported_market_cap, None);
    }

    #[test]
    fn missing_markers_become_none() {
        let csv = "date,adjusted_close,shares_outstanding\n2024-01-02,NaN,\n";
        let rows = CsvDirectorySource::parse_history("X", csv.as_bytes(), day(1), day(5)).unwrap();
        assert_eq!(rows[0].adjusted_close, None);
        assert_eq!(rows[0].shares_outstanding, None);
    }

    #[test]
    fn malformed_number_is_a_parse_error() {
        let csv = "date,adjusted_close,shares_outstanding\n2024-01-02,12..5,1\n";
        let err = CsvDirectorySource::parse_history("X", csv.as_bytes(), day(1), day(5)).unwrap_err();
        assert!(matches!(err, MarketDataError::Parse { row: 1, .. }));
    }

    #[test]
    fn scientific_notation_is_accepted() {
        let csv = "date,adjusted_close,shares_outstanding\n2024-01-02,10,1.5e9\n";
        let rows = CsvDirectorySource::parse_history("X", csv.as_bytes(), day(1), day(5)).unwrap();
        assert_eq!(rows[0].shares_outstanding, Some(dec!(1500000000)));
    }
}
