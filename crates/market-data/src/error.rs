use index_engine::IndexError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value for {symbol} on row {row}: {message}")]
    Parse {
        symbol: String,
        row: u64,
        message: String,
    },

    #[error("No price history found for {0}")]
    NoData(String),

    #[error("Universe is empty: no symbols configured or discovered")]
    EmptyUniverse,

    #[error("Failed to build the price store: {0}")]
    Store(#[from] IndexError),
}
