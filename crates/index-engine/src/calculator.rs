use crate::error::IndexError;
use chrono::NaiveDate;
use core_types::{
    CompositionChange, Constituency, IndexPoint, PriceSnapshot, ResetPolicy,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The value carried between dates once the index exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    date: NaiveDate,
    /// Index level at the last basis reset.
    anchor_level: Decimal,
    level: Decimal,
    /// Level on the inception date.
    base_level: Decimal,
    /// Price of each active constituent at the last basis reset.
    basis: BTreeMap<String, Decimal>,
    /// Most recent observed price of each active constituent.
    last_prices: BTreeMap<String, Decimal>,
    constituency: Constituency,
}

impl ChainState {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn anchor_level(&self) -> Decimal {
        self.anchor_level
    }

    pub fn level(&self) -> Decimal {
        self.level
    }

    pub fn base_level(&self) -> Decimal {
        self.base_level
    }

    pub fn basis(&self) -> &BTreeMap<String, Decimal> {
        &self.basis
    }

    pub fn basis_price(&self, symbol: &str) -> Option<Decimal> {
        self.basis.get(symbol).copied()
    }

    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.last_prices.get(symbol).copied()
    }

    pub fn constituency(&self) -> &Constituency {
        &self.constituency
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CalculatorState {
    #[default]
    Uninitialized,
    /// Inception has been processed.
    Initialized(ChainState),
    Advancing(ChainState),
    /// The date range is exhausted. `last` is the chain as of the final processed date.
    Terminated { last: Option<ChainState> },
}

impl CalculatorState {
    /// The live chain. `None` before inception and after termination.
    pub fn chain(&self) -> Option<&ChainState> {
        match self {
            CalculatorState::Initialized(chain) | CalculatorState::Advancing(chain) => Some(chain),
            _ => None,
        }
    }

    /// The frozen chain of a terminated calculator.
    pub fn final_chain(&self) -> Option<&ChainState> {
        match self {
            CalculatorState::Terminated { last } => last.as_ref(),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, CalculatorState::Terminated { .. })
    }
}

/// The outcome of processing one date: the next state and the point it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: CalculatorState,
    pub point: IndexPoint,
    /// Departing constituents with no price on the date, valued at their last observed price.
    pub stale_exits: Vec<String>,
}

/// Computes the chained equal-weight index level.
///
/// The level is a Laspeyres-style chain: between basis resets,
/// `level(t) = anchor * mean(P_i(t) / B_i)` over the active constituents, where `B_i`
/// is each constituent's price at the last reset. A reset re-anchors at the current
/// level and re-captures the basis from the current date's prices, so a symbol that
/// joins the index starts accruing from zero on the day it joins.
///
/// An active constituent that leaves the index on a date it has no price for exits
/// at its last observed price, i.e. with a zero return for that date. A constituent
/// that stays in the index must be priced, otherwise the date fails with
/// `MissingPrice`.
#[derive(Debug, Clone)]
pub struct IndexCalculator {
    base_value: Decimal,
    reset_policy: ResetPolicy,
}

impl IndexCalculator {
    pub fn new(base_value: Decimal, reset_policy: ResetPolicy) -> Self {
        Self {
            base_value,
            reset_policy,
        }
    }

    /// Folds one date into the chain.
    ///
    /// `constituency` and `change` describe the selection on the snapshot's date. On
    /// error the caller keeps the state it passed in; nothing is consumed.
    pub fn advance(
        &self,
        state: &CalculatorState,
        snapshot: &PriceSnapshot,
        constituency: &Constituency,
        change: &CompositionChange,
    ) -> Result<Step, IndexError> {
        let date = snapshot.date;
        match state {
            CalculatorState::Terminated { .. } => Err(IndexError::Terminated),
            CalculatorState::Uninitialized => self.initialize(snapshot, constituency),
            CalculatorState::Initialized(chain) | CalculatorState::Advancing(chain) => {
                if date <= chain.date {
                    return Err(IndexError::OutOfOrder {
                        date,
                        last: chain.date,
                    });
                }
                self.chain_forward(chain, snapshot, constituency, change)
            }
        }
    }

    /// Freezes the chain, keeping its last value. Any later `advance` fails with `Terminated`.
    pub fn terminate(&self, state: CalculatorState) -> CalculatorState {
        match state {
            CalculatorState::Initialized(chain) | CalculatorState::Advancing(chain) => {
                CalculatorState::Terminated { last: Some(chain) }
            }
            CalculatorState::Uninitialized => CalculatorState::Terminated { last: None },
            terminated @ CalculatorState::Terminated { .. } => terminated,
        }
    }

    fn initialize(&self, snapshot: &PriceSnapshot, constituency: &Constituency) -> Result<Step, IndexError> {
        let basis = capture_basis(snapshot, constituency)?;
        let point = IndexPoint {
            date: snapshot.date,
            index_value: self.base_value,
            daily_return: Decimal::ZERO,
            cumulative_return: Decimal::ZERO,
            constituent_count: constituency.len(),
        };
        let chain = ChainState {
            date: snapshot.date,
            anchor_level: self.base_value,
            level: self.base_value,
            base_level: self.base_value,
            last_prices: basis.clone(),
            basis,
            constituency: constituency.clone(),
        };
        Ok(Step {
            state: CalculatorState::Initialized(chain),
            point,
            stale_exits: Vec::new(),
        })
    }

    fn chain_forward(
        &self,
        chain: &ChainState,
        snapshot: &PriceSnapshot,
        constituency: &Constituency,
        change: &CompositionChange,
    ) -> Result<Step, IndexError> {
        let date = snapshot.date;
        if chain.basis.is_empty() {
            return Err(IndexError::Data(format!(
                "active constituency for {} is empty",
                chain.date
            )));
        }

        // The period return is measured over the set that was active going into `date`.
        let mut missing = Vec::new();
        let mut stale_exits = Vec::new();
        let mut last_prices = BTreeMap::new();
        let mut relative_sum = Decimal::ZERO;
        for (symbol, basis_price) in &chain.basis {
            let price = match snapshot.price(symbol) {
                Some(price) => price,
                None if !constituency.contains(symbol) => match chain.last_price(symbol) {
                    Some(last) => {
                        stale_exits.push(symbol.clone());
                        last
                    }
                    None => {
                        missing.push(symbol.clone());
                        continue;
                    }
                },
                None => {
                    missing.push(symbol.clone());
                    continue;
                }
            };
            relative_sum += price / *basis_price;
            last_prices.insert(symbol.clone(), price);
        }
        if !missing.is_empty() {
            return Err(IndexError::MissingPrice {
                date,
                symbols: missing,
            });
        }
        if !stale_exits.is_empty() {
            tracing::warn!(
                %date,
                "No price for departing constituents {}; valued at last observed price",
                stale_exits.join(", ")
            );
        }

        let mean_relative = relative_sum / Decimal::from(chain.basis.len());
        let level = chain.anchor_level * mean_relative;
        let point = IndexPoint {
            date,
            index_value: level,
            daily_return: level / chain.level - Decimal::ONE,
            cumulative_return: level / chain.base_level - Decimal::ONE,
            constituent_count: chain.basis.len(),
        };

        // A stale exit implies a membership change, so the departing symbol never
        // survives into the next basis.
        let reset = matches!(change, CompositionChange::Rebalance(_))
            || self.reset_policy == ResetPolicy::Daily;
        let (anchor_level, basis, last_prices) = if reset {
            let basis = capture_basis(snapshot, constituency)?;
            (level, basis.clone(), basis)
        } else {
            (chain.anchor_level, chain.basis.clone(), last_prices)
        };

        let next = ChainState {
            date,
            anchor_level,
            level,
            base_level: chain.base_level,
            basis,
            last_prices,
            constituency: constituency.clone(),
        };
        Ok(Step {
            state: CalculatorState::Advancing(next),
            point,
            stale_exits,
        })
    }
}

/// Records each member's price on the snapshot's date as its new basis price.
fn capture_basis(
    snapshot: &PriceSnapshot,
    constituency: &Constituency,
) -> Result<BTreeMap<String, Decimal>, IndexError> {
    let mut basis = BTreeMap::new();
    let mut missing = Vec::new();
    for symbol in constituency.symbols() {
        match snapshot.price(symbol) {
            Some(price) => {
                basis.insert(symbol.to_string(), price);
            }
            None => missing.push(symbol.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(IndexError::MissingPrice {
            date: snapshot.date,
            symbols: missing,
        });
    }
    if basis.is_empty() {
        return Err(IndexError::Data(format!(
            "cannot capture a basis from an empty constituency on {}",
            snapshot.date
        )));
    }
    Ok(basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebalancer::IndexRebalancer;
    use crate::selector::ConstituentSelector;
    use core_types::{PriceObservation, ShortfallPolicy};
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn snapshot(date: NaiveDate, prices: &[(&str, Decimal)]) -> PriceSnapshot {
        PriceSnapshot::from_observations(
            date,
            prices
                .iter()
                .map(|(s, p)| PriceObservation::new(*s, date, *p, Decimal::ONE)),
        )
        .unwrap()
    }

    struct Harness {
        selector: ConstituentSelector,
        rebalancer: IndexRebalancer,
        calculator: IndexCalculator,
        state: CalculatorState,
    }

    impl Harness {
        fn new(count: usize, reset_policy: ResetPolicy) -> Self {
            Self {
                selector: ConstituentSelector::new(count, ShortfallPolicy::Skip),
                rebalancer: IndexRebalancer::new(),
                calculator: IndexCalculator::new(dec!(100), reset_policy),
                state: CalculatorState::Uninitialized,
            }
        }

        fn step(&mut self, snap: &PriceSnapshot) -> Result<IndexPoint, IndexError> {
            let constituency = self.selector.select(snap)?;
            let previous = self.state.chain().map(ChainState::constituency);
            let change = self.rebalancer.compare(previous, &constituency);
            let step = self
                .calculator
                .advance(&self.state, snap, &constituency, &change)?;
            self.state = step.state;
            Ok(step.point)
        }
    }

    #[test]
    fn inception_sets_base_value_and_basis() {
        let mut h = Harness::new(2, ResetPolicy::OnChange);
        let point = h
            .step(&snapshot(day(2), &[("A", dec!(10)), ("B", dec!(20))]))
            .unwrap();

        assert_eq!(point.index_value, dec!(100));
        assert_eq!(point.daily_return, Decimal::ZERO);
        assert_eq!(point.constituent_count, 2);
        let chain = h.state.chain().unwrap();
        assert!(matches!(h.state, CalculatorState::Initialized(_)));
        assert_eq!(chain.basis_price("B"), Some(dec!(20)));
        assert_eq!(chain.last_price("B"), Some(dec!(20)));
        assert!(chain.constituency().members.iter().all(|m| m.weight == dec!(0.5)));
    }

    #[test]
    fn level_is_anchor_times_mean_price_relative() {
        let mut h = Harness::new(2, ResetPolicy::OnChange);
        h.step(&snapshot(day(2), &[("A", dec!(10)), ("B", dec!(20))]))
            .unwrap();
        // A +20%, B -10%: mean relative 1.05.
        let point = h
            .step(&snapshot(day(3), &[("A", dec!(12)), ("B", dec!(18))]))
            .unwrap();
        assert_eq!(point.index_value, dec!(105));
        assert_eq!(point.daily_return, dec!(0.05));
        assert!(matches!(h.state, CalculatorState::Advancing(_)));

        // No membership change: the basis still points at inception prices.
        let point = h
            .step(&snapshot(day(4), &[("A", dec!(10)), ("B", dec!(22))]))
            .unwrap();
        assert_eq!(point.index_value, dec!(105));
        assert_eq!(point.daily_return, Decimal::ZERO);
        assert_eq!(point.cumulative_return, dec!(0.05));
        assert_eq!(h.state.chain().unwrap().basis_price("A"), Some(dec!(10)));
    }

    #[test]
    fn daily_reset_rebases_every_date() {
        let mut h = Harness::new(2, ResetPolicy::Daily);
        h.step(&snapshot(day(2), &[("A", dec!(10)), ("B", dec!(20))]))
            .unwrap();
        h.step(&snapshot(day(3), &[("A", dec!(12)), ("B", dec!(18))]))
            .unwrap();
        // Relatives against day 3: 10/12 and 22/18.
        let point = h
            .step(&snapshot(day(4), &[("A", dec!(10)), ("B", dec!(22))]))
            .unwrap();

        let expected = dec!(105) * (dec!(10) / dec!(12) + dec!(22) / dec!(18)) / dec!(2);
        assert!((point.index_value - expected).abs() < dec!(0.0000000001));
        assert_eq!(h.state.chain().unwrap().basis_price("A"), Some(dec!(10)));
    }

    #[test]
    fn departing_member_without_price_exits_at_last_observed_price() {
        let mut h = Harness::new(2, ResetPolicy::OnChange);
        h.step(&snapshot(day(2), &[("A", dec!(10)), ("B", dec!(20)), ("C", dec!(5))]))
            .unwrap();
        h.step(&snapshot(day(3), &[("A", dec!(10)), ("B", dec!(22)), ("C", dec!(5))]))
            .unwrap();

        // B has no more prices; A and C fill the selection, so B leaves at 22.
        let snap = snapshot(day(4), &[("A", dec!(11)), ("C", dec!(5))]);
        let constituency = h.selector.select(&snap).unwrap();
        let change = h
            .rebalancer
            .compare(h.state.chain().map(ChainState::constituency), &constituency);
        let step = h
            .calculator
            .advance(&h.state, &snap, &constituency, &change)
            .unwrap();

        assert_eq!(step.stale_exits, vec!["B".to_string()]);
        // (11/10 + 22/20) / 2 = 1.1
        assert_eq!(step.point.index_value, dec!(110));
        let chain = step.state.chain().unwrap();
        assert_eq!(chain.basis_price("B"), None);
        assert_eq!(chain.basis_price("C"), Some(dec!(5)));
        assert_eq!(chain.anchor_level(), dec!(110));
    }

    #[test]
    fn staying_member_without_price_leaves_state_untouched() {
        let mut h = Harness::new(2, ResetPolicy::OnChange);
        h.step(&snapshot(day(2), &[("A", dec!(10)), ("B", dec!(20))]))
            .unwrap();
        let before = h.state.clone();

        // Same membership as yesterday, but B is unpriced.
        let snap = snapshot(day(3), &[("A", dec!(10))]);
        let constituency = before.chain().unwrap().constituency().clone();
        let change = CompositionChange::Unchanged { date: day(3) };
        let err = h
            .calculator
            .advance(&before, &snap, &constituency, &change)
            .unwrap_err();

        assert_eq!(
            err,
            IndexError::MissingPrice {
                date: day(3),
                symbols: vec!["B".to_string()]
            }
        );
        assert_eq!(h.state, before);
    }

    #[test]
    fn dates_must_ascend() {
        let mut h = Harness::new(1, ResetPolicy::OnChange);
        h.step(&snapshot(day(5), &[("A", dec!(10))])).unwrap();
        let err = h.step(&snapshot(day(5), &[("A", dec!(11))])).unwrap_err();
        assert_eq!(
            err,
            IndexError::OutOfOrder {
                date: day(5),
                last: day(5)
            }
        );
    }

    #[test]
    fn terminated_calculator_rejects_further_dates() {
        let mut h = Harness::new(1, ResetPolicy::OnChange);
        h.step(&snapshot(day(2), &[("A", dec!(10))])).unwrap();
        h.state = h.calculator.terminate(h.state.clone());
        assert!(h.state.is_terminated());
        assert!(h.state.chain().is_none());
        assert_eq!(h.state.final_chain().map(ChainState::date), Some(day(2)));
        assert_eq!(
            h.step(&snapshot(day(3), &[("A", dec!(11))])).unwrap_err(),
            IndexError::Terminated
        );
    }
}
