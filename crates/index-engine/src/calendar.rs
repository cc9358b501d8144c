use crate::store::PriceStore;
use chrono::{Datelike, NaiveDate, Weekday};
use core_types::CalendarKind;
use std::collections::BTreeSet;

/// Decides which dates the pipeline walks through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingCalendar {
    kind: CalendarKind,
    holidays: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(kind: CalendarKind, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            kind,
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Every date the store has data for.
    pub fn observed() -> Self {
        Self::new(CalendarKind::Observed, [])
    }

    /// Monday to Friday, minus `holidays`. Dates without data are reported as gaps.
    pub fn weekdays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self::new(CalendarKind::Weekdays, holidays)
    }

    pub fn kind(&self) -> CalendarKind {
        self.kind
    }

    /// Trading dates in `[start, end]`, ascending.
    pub fn dates(&self, store: &dyn PriceStore, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        match self.kind {
            CalendarKind::Observed => store.dates(start, end),
            CalendarKind::Weekdays => start
                .iter_days()
                .take_while(|d| *d <= end)
                .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
                .filter(|d| !self.holidays.contains(d))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPriceStore;
    use core_types::PriceObservation;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn weekdays_skip_weekends_and_holidays() {
        let store = InMemoryPriceStore::new();
        // 2024-01-12 is a Friday, 2024-01-15 a Monday holiday.
        let calendar = TradingCalendar::weekdays([date(1, 15)]);
        let dates = calendar.dates(&store, date(1, 11), date(1, 17));
        assert_eq!(dates, vec![date(1, 11), date(1, 12), date(1, 16), date(1, 17)]);
    }

    #[test]
    fn observed_follows_the_store() {
        let store = InMemoryPriceStore::from_observations(vec![
            PriceObservation::new("A", date(1, 13), dec!(1), dec!(1)),
            PriceObservation::new("A", date(1, 16), dec!(1), dec!(1)),
        ])
        .unwrap();
        let dates = TradingCalendar::observed().dates(&store, date(1, 1), date(1, 31));
        assert_eq!(dates, vec![date(1, 13), date(1, 16)]);
    }
}
