use crate::enums::ChangeType;
use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single end-of-day observation for one symbol, as supplied by the market data feed.
///
/// Fields the feed could not provide are `None`. Observations are immutable once
/// fetched and are keyed by `(symbol, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: String,
    pub date: NaiveDate,
    pub adjusted_close: Option<Decimal>,
    pub shares_outstanding: Option<Decimal>,
    /// Market cap as reported by the feed, used when shares outstanding is unavailable.
    pub reported_market_cap: Option<Decimal>,
}

impl PriceObservation {
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        adjusted_close: Decimal,
        shares_outstanding: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            adjusted_close: Some(adjusted_close),
            shares_outstanding: Some(shares_outstanding),
            reported_market_cap: None,
        }
    }

    /// The adjusted close, if present and strictly positive.
    pub fn valid_price(&self) -> Option<Decimal> {
        self.adjusted_close.filter(|p| *p > Decimal::ZERO)
    }

    /// Market capitalization: `adjusted_close * shares_outstanding`, falling back to the
    /// reported market cap. `None` unless the result is strictly positive.
    pub fn market_cap(&self) -> Option<Decimal> {
        let price = self.valid_price()?;
        let cap = match self.shares_outstanding {
            Some(shares) if shares > Decimal::ZERO => price.checked_mul(shares)?,
            _ => self.reported_market_cap?,
        };
        (cap > Decimal::ZERO).then_some(cap)
    }
}

/// Every observation available for one trading date, keyed by symbol.
///
/// A snapshot is either fully materialized or empty; the store never hands out
/// a partially written date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub date: NaiveDate,
    observations: BTreeMap<String, PriceObservation>,
}

impl PriceSnapshot {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            observations: BTreeMap::new(),
        }
    }

    /// Builds a snapshot, rejecting observations that belong to another date.
    pub fn from_observations<I>(date: NaiveDate, observations: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = PriceObservation>,
    {
        let mut snapshot = Self::empty(date);
        for observation in observations {
            snapshot.insert(observation)?;
        }
        Ok(snapshot)
    }

    /// Adds an observation. A later observation for the same symbol replaces the earlier one.
    pub fn insert(&mut self, observation: PriceObservation) -> Result<(), CoreError> {
        if observation.date != self.date {
            return Err(CoreError::DateMismatch {
                symbol: observation.symbol,
                expected: self.date,
                found: observation.date,
            });
        }
        self.observations
            .insert(observation.symbol.clone(), observation);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceObservation> {
        self.observations.get(symbol)
    }

    /// The valid (present and positive) adjusted close for a symbol on this date.
    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.get(symbol).and_then(PriceObservation::valid_price)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceObservation> {
        self.observations.values()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// One member of a constituency, in market-cap rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstituentRecord {
    pub symbol: String,
    /// 1-based rank by market cap on the selection date.
    pub rank: usize,
    pub market_cap: Decimal,
    pub weight: Decimal,
}

/// The set of index members selected for a single trading date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituency {
    pub date: NaiveDate,
    pub members: Vec<ConstituentRecord>,
}

impl Constituency {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.members.iter().any(|m| m.symbol == symbol)
    }

    /// Member symbols in rank order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.symbol.as_str())
    }

    pub fn symbol_set(&self) -> BTreeSet<&str> {
        self.symbols().collect()
    }

    /// True when both constituencies hold exactly the same symbols, ignoring rank.
    pub fn same_members(&self, other: &Constituency) -> bool {
        self.symbol_set() == other.symbol_set()
    }
}

/// A change in index membership between two consecutive processed dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceEvent {
    pub date: NaiveDate,
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl RebalanceEvent {
    pub fn num_added(&self) -> usize {
        self.added.len()
    }

    pub fn num_removed(&self) -> usize {
        self.removed.len()
    }
}

/// A row of the composition change log. There is one per processed date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositionChange {
    /// The first processed date. Every member counts as added, but this is not a rebalance.
    Inception {
        date: NaiveDate,
        added: BTreeSet<String>,
    },
    Rebalance(RebalanceEvent),
    Unchanged { date: NaiveDate },
}

impl CompositionChange {
    pub fn date(&self) -> NaiveDate {
        match self {
            CompositionChange::Inception { date, .. } => *date,
            CompositionChange::Rebalance(event) => event.date,
            CompositionChange::Unchanged { date } => *date,
        }
    }

    pub fn change_type(&self) -> ChangeType {
        match self {
            CompositionChange::Inception { .. } => ChangeType::Inception,
            CompositionChange::Rebalance(_) => ChangeType::Rebalance,
            CompositionChange::Unchanged { .. } => ChangeType::NoChange,
        }
    }

    pub fn as_rebalance(&self) -> Option<&RebalanceEvent> {
        match self {
            CompositionChange::Rebalance(event) => Some(event),
            _ => None,
        }
    }
}

/// A single point of the index level series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPoint {
    pub date: NaiveDate,
    pub index_value: Decimal,
    /// Simple return versus the previous point, as a fraction. Zero on inception.
    pub daily_return: Decimal,
    /// Return versus the inception level, as a fraction.
    pub cumulative_return: Decimal,
    /// Size of the constituency the day's return was measured over.
    pub constituent_count: usize,
}

/// Why a trading date produced no index point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NoData,
    InsufficientData { available: usize, required: usize },
    MissingPrice { symbols: Vec<String> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no price data"),
            SkipReason::InsufficientData {
                available,
                required,
            } => write!(
                f,
                "insufficient data: {} eligible symbols, {} required",
                available, required
            ),
            SkipReason::MissingPrice { symbols } => {
                write!(f, "missing price for {}", symbols.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDate {
    pub date: NaiveDate,
    pub reason: SkipReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn market_cap_uses_shares_then_reported_value() {
        let obs = PriceObservation::new("AAPL", day(2), dec!(190.5), dec!(1000));
        assert_eq!(obs.market_cap(), Some(dec!(190500)));

        let reported = PriceObservation {
            shares_outstanding: None,
            reported_market_cap: Some(dec!(5000)),
            ..obs.clone()
        };
        assert_eq!(reported.market_cap(), Some(dec!(5000)));

        let no_price = PriceObservation {
            adjusted_close: None,
            ..obs
        };
        assert_eq!(no_price.market_cap(), None);
    }

    #[test]
    fn non_positive_values_are_not_valid() {
        let zero_price = PriceObservation::new("X", day(2), dec!(0), dec!(10));
        assert_eq!(zero_price.valid_price(), None);
        assert_eq!(zero_price.market_cap(), None);

        let zero_shares = PriceObservation::new("X", day(2), dec!(5), dec!(0));
        assert_eq!(zero_shares.valid_price(), Some(dec!(5)));
        assert_eq!(zero_shares.market_cap(), None);
    }

    #[test]
    fn snapshot_rejects_foreign_dates() {
        let mut snapshot = PriceSnapshot::empty(day(2));
        let err = snapshot
            .insert(PriceObservation::new("MSFT", day(3), dec!(1), dec!(1)))
            .unwrap_err();
        assert!(matches!(err, CoreError::DateMismatch { .. }));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn same_members_ignores_rank_order() {
        let member = |symbol: &str, rank| ConstituentRecord {
            symbol: symbol.to_string(),
            rank,
            market_cap: dec!(1),
            weight: dec!(0.5),
        };
        let a = Constituency {
            date: day(2),
            members: vec![member("A", 1), member("B", 2)],
        };
        let b = Constituency {
            date: day(3),
            members: vec![member("B", 1), member("A", 2)],
        };
        assert!(a.same_members(&b));
        assert!(a.contains("B"));
        assert!(!a.contains("C"));
    }

    #[test]
    fn skip_reason_serializes_with_its_payload() {
        let skipped = SkippedDate {
            date: day(4),
            reason: SkipReason::InsufficientData {
                available: 8,
                required: 10,
            },
        };
        let json = serde_json::to_string(&skipped).unwrap();
        assert!(json.contains("InsufficientData"));
        assert_eq!(
            skipped.reason.to_string(),
            "insufficient data: 8 eligible symbols, 10 required"
        );
    }
}
