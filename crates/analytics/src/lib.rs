//! # Index Analytics
//!
//! Risk and return metrics for the index level series. This is the last step of
//! the pipeline before export.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** A pure logic crate. It depends only on `core-types`.
//! - **Stateless Calculation:** `MetricsEngine` takes the full `IndexPoint` sequence
//!   and the rebalance log and produces a `SummaryMetrics` snapshot. Nothing is
//!   maintained incrementally, so the snapshot can never go stale.
//!
//! ## Public API
//!
//! - `MetricsEngine`: the calculator.
//! - `SummaryMetrics`, `DayReturn`: its output.
//! - `AnalyticsError`: the errors individual metric functions can return.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{MetricsEngine, TRADING_DAYS_PER_YEAR};
pub use error::AnalyticsError;
pub use report::{DayReturn, SummaryMetrics};
