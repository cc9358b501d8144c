//! # Market Data
//!
//! The adapter between raw end-of-day price history and the index engine.
//! Fetching is the only concurrent part of the system: every symbol is loaded
//! in parallel and the result is fully materialized into an
//! `InMemoryPriceStore` before any index calculation starts.

use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::PriceObservation;

pub mod csv_source;
pub mod error;
pub mod universe;

// --- Public API ---
pub use csv_source::CsvDirectorySource;
pub use error::MarketDataError;
pub use universe::{UniverseFetch, fetch_universe, normalize_symbol};

/// The abstract interface for a provider of daily price history.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Every symbol the source can serve.
    async fn list_symbols(&self) -> Result<Vec<String>, MarketDataError>;

    /// Daily observations for `symbol` in `[start, end]`, ascending by date.
    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, MarketDataError>;
}
