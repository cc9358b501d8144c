//! # Core Types
//!
//! Layer 0 of the index tracker. Every other crate speaks in these types: raw
//! price observations as they come out of the market data feed, the per-date
//! constituency chosen by the selector, the rebalance log, and the index points
//! produced by the calculator.
//!
//! This crate has no knowledge of storage, I/O or configuration files.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{CalendarKind, ChangeType, ResetPolicy, ShortfallPolicy};
pub use error::CoreError;
pub use structs::{
    CompositionChange, Constituency, ConstituentRecord, IndexPoint, PriceObservation,
    PriceSnapshot, RebalanceEvent, SkipReason, SkippedDate,
};
