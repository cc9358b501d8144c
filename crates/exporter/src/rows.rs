use analytics::{DayReturn, SummaryMetrics};
use chrono::NaiveDate;
use core_types::{CompositionChange, Constituency, IndexPoint, SkippedDate};
use rust_decimal::Decimal;
use serde::Serialize;

const NOT_AVAILABLE: &str = "n/a";

fn as_pct(value: Decimal) -> Decimal {
    (value * Decimal::ONE_HUNDRED).round_dp(6)
}

fn join(symbols: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    symbols
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceRow {
    pub date: NaiveDate,
    pub index_value: Decimal,
    pub daily_return_pct: Decimal,
    pub cumulative_return_pct: Decimal,
    pub constituents: usize,
}

impl From<&IndexPoint> for PerformanceRow {
    fn from(point: &IndexPoint) -> Self {
        Self {
            date: point.date,
            index_value: point.index_value.round_dp(6),
            daily_return_pct: as_pct(point.daily_return),
            cumulative_return_pct: as_pct(point.cumulative_return),
            constituents: point.constituent_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionRow {
    pub date: NaiveDate,
    pub rank: usize,
    pub symbol: String,
    pub market_cap: Decimal,
    pub weight: Decimal,
}

impl CompositionRow {
    pub fn for_constituency(constituency: &Constituency) -> impl Iterator<Item = CompositionRow> + '_ {
        constituency.members.iter().map(|m| CompositionRow {
            date: constituency.date,
            rank: m.rank,
            symbol: m.symbol.clone(),
            market_cap: m.market_cap,
            weight: m.weight.round_dp(8),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRow {
    pub date: NaiveDate,
    pub tickers_added: String,
    pub tickers_removed: String,
    pub num_added: usize,
    pub num_removed: usize,
    pub change_type: String,
}

impl From<&CompositionChange> for ChangeRow {
    fn from(change: &CompositionChange) -> Self {
        let (added, removed) = match change {
            CompositionChange::Inception { added, .. } => (join(added), String::new()),
            CompositionChange::Rebalance(event) => (join(&event.added), join(&event.removed)),
            CompositionChange::Unchanged { .. } => (String::new(), String::new()),
        };
        let (num_added, num_removed) = match change {
            CompositionChange::Inception { added, .. } => (added.len(), 0),
            CompositionChange::Rebalance(event) => (event.num_added(), event.num_removed()),
            CompositionChange::Unchanged { .. } => (0, 0),
        };
        Self {
            date: change.date(),
            tickers_added: added,
            tickers_removed: removed,
            num_added,
            num_removed,
            change_type: change.change_type().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub date: NaiveDate,
    pub reason: String,
}

impl From<&SkippedDate> for SkippedRow {
    fn from(skipped: &SkippedDate) -> Self {
        Self {
            date: skipped.date,
            reason: skipped.reason.to_string(),
        }
    }
}

/// A key-value pair for the summary sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricRow {
    pub metric: String,
    pub value: String,
}

impl MetricRow {
    pub fn new(metric: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
        }
    }

    fn percent(metric: &str, value: Option<Decimal>, precision: usize) -> Self {
        let value = match value {
            Some(v) => format!("{:.prec$}%", v * Decimal::ONE_HUNDRED, prec = precision),
            None => NOT_AVAILABLE.to_string(),
        };
        Self::new(metric, value)
    }

    fn day(metric: &str, day: Option<DayReturn>) -> Self {
        let value = match day {
            Some(d) => format!("{} ({:.2}%)", d.date, d.daily_return * Decimal::ONE_HUNDRED),
            None => NOT_AVAILABLE.to_string(),
        };
        Self::new(metric, value)
    }
}

/// The summary metrics as display rows. Undefined metrics read `n/a`.
pub fn metric_rows(metrics: &SummaryMetrics, skipped_dates: usize) -> Vec<MetricRow> {
    let sharpe = match metrics.sharpe_ratio {
        Some(s) => format!("{:.2}", s),
        None => NOT_AVAILABLE.to_string(),
    };
    vec![
        MetricRow::percent("Total Return (%)", metrics.total_return, 2),
        MetricRow::percent("Average Daily Return (%)", metrics.average_daily_return, 4),
        MetricRow::percent("Annualized Volatility (%)", metrics.annualized_volatility, 2),
        MetricRow::new("Sharpe Ratio", sharpe),
        MetricRow::percent("Maximum Drawdown (%)", Some(metrics.max_drawdown), 2),
        MetricRow::day("Best Performing Day", metrics.best_day),
        MetricRow::day("Worst Performing Day", metrics.worst_day),
        MetricRow::new("Total Composition Changes", metrics.total_rebalance_count.to_string()),
        MetricRow::new("Number of Trading Days", metrics.trading_days.to_string()),
        MetricRow::new("Skipped Dates", skipped_dates.to_string()),
    ]
}
