use crate::MarketDataSource;
use crate::error::MarketDataError;
use chrono::NaiveDate;
use core_types::PriceObservation;
use futures::stream::{self, StreamExt};
use index_engine::InMemoryPriceStore;
use indicatif::{ProgressBar, ProgressStyle};

/// Uppercases a ticker and maps share-class dots to dashes (`BRK.B` -> `BRK-B`).
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_ascii_uppercase().replace('.', "-")
}

/// The outcome of fetching a whole universe.
#[derive(Debug, Default)]
pub struct UniverseFetch {
    pub observations: Vec<PriceObservation>,
    pub succeeded: Vec<String>,
    /// Symbols that could not be fetched, with the reason. They are left out of the store.
    pub failed: Vec<(String, MarketDataError)>,
}

impl UniverseFetch {
    pub fn failed_symbols(&self) -> Vec<&str> {
        self.failed.iter().map(|(s, _)| s.as_str()).collect()
    }

    /// Materializes every fetched observation before the engine starts.
    pub fn into_store(self) -> Result<InMemoryPriceStore, MarketDataError> {
        Ok(InMemoryPriceStore::from_observations(self.observations)?)
    }
}

/// Fetches history for every symbol, at most `max_concurrency` at a time.
///
/// A symbol that fails is logged and recorded in `UniverseFetch::failed`; the
/// fetch as a whole only fails when the universe is empty.
pub async fn fetch_universe(
    source: &dyn MarketDataSource,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    max_concurrency: usize,
) -> Result<UniverseFetch, MarketDataError> {
    if symbols.is_empty() {
        return Err(MarketDataError::EmptyUniverse);
    }
    tracing::info!(
        symbols = symbols.len(),
        %start,
        %end,
        "Fetching price history"
    );

    let progress_bar = ProgressBar::new(symbols.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut results = stream::iter(symbols.iter().cloned())
        .map(|symbol| {
            let pb = progress_bar.clone();
            async move {
                let result = source.fetch_history(&symbol, start, end).await;
                pb.set_message(symbol.clone());
                pb.inc(1);
                (symbol, result)
            }
        })
        .buffer_unordered(max_concurrency.max(1))
        .collect::<Vec<_>>()
        .await;
    progress_bar.finish_with_message("Fetch complete!");

    // Completion order is nondeterministic.
    results.sort_by(|a, b| a.0.cmp(&b.0));

    let mut fetch = UniverseFetch::default();
    for (symbol, result) in results {
        match result {
            Ok(mut rows) => {
                fetch.observations.append(&mut rows);
                fetch.succeeded.push(symbol);
            }
            Err(e) => {
                tracing::warn!(%symbol, "Failed to fetch price history: {}", e);
                fetch.failed.push((symbol, e));
            }
        }
    }

    tracing::info!(
        succeeded = fetch.succeeded.len(),
        failed = fetch.failed.len(),
        rows = fetch.observations.len(),
        "Data fetch completed"
    );
    if !fetch.failed.is_empty() {
        tracing::warn!("Failed symbols: {}", fetch.failed_symbols().join(", "));
    }
    Ok(fetch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_normalized() {
        assert_eq!(normalize_symbol(" brk.b "), "BRK-B");
        assert_eq!(normalize_symbol("MSFT"), "MSFT");
    }
}
