use crate::error::IndexError;
use chrono::NaiveDate;
use core_types::{PriceObservation, PriceSnapshot};
use std::collections::{BTreeMap, BTreeSet};

/// Read access to materialized price observations, by trading date.
///
/// Implementations must return either every observation stored for a date or an
/// empty snapshot. The engine never sees a half-written date.
pub trait PriceStore {
    /// All observations for `date`, keyed by symbol.
    fn get_prices(&self, date: NaiveDate) -> PriceSnapshot;

    /// Dates in `[start, end]` with at least one observation, ascending.
    fn dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;
}

/// An ordered, in-memory `PriceStore`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryPriceStore {
    by_date: BTreeMap<NaiveDate, PriceSnapshot>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observations<I>(observations: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = PriceObservation>,
    {
        let mut store = Self::new();
        for observation in observations {
            store.insert(observation)?;
        }
        Ok(store)
    }

    /// Stores an observation under its own date, replacing any earlier one for the same symbol.
    pub fn insert(&mut self, observation: PriceObservation) -> Result<(), IndexError> {
        let date = observation.date;
        self.by_date
            .entry(date)
            .or_insert_with(|| PriceSnapshot::empty(date))
            .insert(observation)?;
        Ok(())
    }

    pub fn symbols(&self) -> BTreeSet<String> {
        self.by_date
            .values()
            .flat_map(|snapshot| snapshot.iter().map(|o| o.symbol.clone()))
            .collect()
    }

    pub fn observation_count(&self) -> usize {
        self.by_date.values().map(PriceSnapshot::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// First and last stored dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.by_date.keys().next()?;
        let last = self.by_date.keys().next_back()?;
        Some((*first, *last))
    }
}

impl PriceStore for InMemoryPriceStore {
    fn get_prices(&self, date: NaiveDate) -> PriceSnapshot {
        self.by_date
            .get(&date)
            .cloned()
            .unwrap_or_else(|| PriceSnapshot::empty(date))
    }

    fn dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if end < start {
            return Vec::new();
        }
        self.by_date.range(start..=end).map(|(date, _)| *date).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn groups_observations_by_date() {
        let store = InMemoryPriceStore::from_observations(vec![
            PriceObservation::new("MSFT", day(3), dec!(370), dec!(7)),
            PriceObservation::new("AAPL", day(2), dec!(185), dec!(15)),
            PriceObservation::new("MSFT", day(2), dec!(371), dec!(7)),
        ])
        .unwrap();

        assert_eq!(store.get_prices(day(2)).len(), 2);
        assert_eq!(store.get_prices(day(3)).price("MSFT"), Some(dec!(370)));
        assert!(store.get_prices(day(4)).is_empty());
        assert_eq!(store.observation_count(), 3);
        assert_eq!(store.date_range(), Some((day(2), day(3))));
        assert_eq!(store.symbols().len(), 2);
    }

    #[test]
    fn dates_are_bounded_and_ascending() {
        let store = InMemoryPriceStore::from_observations(
            [5, 2, 9, 3].map(|d| PriceObservation::new("A", day(d), dec!(1), dec!(1))),
        )
        .unwrap();

        assert_eq!(store.dates(day(3), day(9)), vec![day(3), day(5), day(9)]);
        assert!(store.dates(day(9), day(3)).is_empty());
    }
}
