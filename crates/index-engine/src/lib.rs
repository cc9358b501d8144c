//! # Index Engine
//!
//! The index construction and rebalancing engine. For each trading date, in
//! ascending order, it:
//!
//! 1. selects the top-N symbols by market cap (`ConstituentSelector`),
//! 2. diffs the selection against the previous date (`IndexRebalancer`),
//! 3. advances the chained equal-weight index level (`IndexCalculator`).
//!
//! The calculator state is an immutable value folded over the date sequence by
//! `IndexPipeline`; nothing is shared or mutated across components. Raw prices
//! are read through the `PriceStore` trait and must be fully materialized before
//! the pipeline starts.

pub mod calculator;
pub mod calendar;
pub mod error;
pub mod pipeline;
pub mod rebalancer;
pub mod selector;
pub mod store;

pub use calculator::{CalculatorState, ChainState, IndexCalculator, Step};
pub use calendar::TradingCalendar;
pub use error::IndexError;
pub use pipeline::{IndexPipeline, IndexRun, StaleExit};
pub use rebalancer::IndexRebalancer;
pub use selector::ConstituentSelector;
pub use store::{InMemoryPriceStore, PriceStore};
