use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single day's index return, tagged with its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayReturn {
    pub date: NaiveDate,
    pub daily_return: Decimal,
}

/// A read-only snapshot of the index's risk and return profile.
///
/// This struct is the final output of the `MetricsEngine`. Every metric that can be
/// undefined for a short or constant series is an `Option`, and is reported as null.
/// All returns and volatilities are fractions (0.1 means 10%).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    // I. Returns
    pub total_return: Option<Decimal>,
    pub average_daily_return: Option<Decimal>,

    // II. Risk
    pub annualized_volatility: Option<Decimal>, // None when stdev is zero or undefined
    pub sharpe_ratio: Option<Decimal>,          // None for the same reason
    pub max_drawdown: Decimal,

    // III. Extremes
    pub best_day: Option<DayReturn>,
    pub worst_day: Option<DayReturn>,

    // IV. Composition and coverage
    pub total_rebalance_count: usize,
    pub trading_days: usize,
}

impl SummaryMetrics {
    /// Creates an empty report, the starting point before calculations.
    pub fn new() -> Self {
        Self {
            total_return: None,
            average_daily_return: None,
            annualized_volatility: None,
            sharpe_ratio: None,
            max_drawdown: Decimal::ZERO,
            best_day: None,
            worst_day: None,
            total_rebalance_count: 0,
            trading_days: 0,
        }
    }
}

impl Default for SummaryMetrics {
    fn default() -> Self {
        Self::new()
    }
}
