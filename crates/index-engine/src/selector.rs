use crate::error::IndexError;
use chrono::NaiveDate;
use core_types::{Constituency, ConstituentRecord, PriceSnapshot, ShortfallPolicy};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Picks the top-N symbols by market capitalization for a trading date.
///
/// A symbol is eligible when it has a positive adjusted close and a positive
/// market cap. Eligible symbols are ranked by market cap, descending; equal market
/// caps are ordered by symbol, ascending, so the selection is fully deterministic.
#[derive(Debug, Clone)]
pub struct ConstituentSelector {
    constituent_count: usize,
    policy: ShortfallPolicy,
    cache: HashMap<NaiveDate, Constituency>,
}

impl ConstituentSelector {
    pub fn new(constituent_count: usize, policy: ShortfallPolicy) -> Self {
        Self {
            constituent_count,
            policy,
            cache: HashMap::new(),
        }
    }

    pub fn constituent_count(&self) -> usize {
        self.constituent_count
    }

    /// Ranks the snapshot and selects its top `constituent_count` symbols.
    ///
    /// Under `ShortfallPolicy::Skip` fewer eligible symbols than required is an
    /// `InsufficientData` error. Under `ShortfallPolicy::Partial` every eligible symbol
    /// is selected and only an empty selection is an error.
    pub fn select(&self, snapshot: &PriceSnapshot) -> Result<Constituency, IndexError> {
        let mut eligible: Vec<(&str, Decimal)> = snapshot
            .iter()
            .filter_map(|obs| obs.market_cap().map(|cap| (obs.symbol.as_str(), cap)))
            .collect();

        let available = eligible.len();
        let shortfall = available < self.constituent_count;
        if shortfall && (self.policy == ShortfallPolicy::Skip || available == 0) {
            return Err(IndexError::InsufficientData {
                date: snapshot.date,
                available,
                required: self.constituent_count,
            });
        }
        if shortfall {
            tracing::warn!(
                date = %snapshot.date,
                available,
                required = self.constituent_count,
                "Selecting a partial constituency"
            );
        }

        eligible.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        eligible.truncate(self.constituent_count);

        let weight = Decimal::ONE / Decimal::from(eligible.len());
        let members = eligible
            .into_iter()
            .enumerate()
            .map(|(i, (symbol, market_cap))| ConstituentRecord {
                symbol: symbol.to_string(),
                rank: i + 1,
                market_cap,
                weight,
            })
            .collect();

        Ok(Constituency {
            date: snapshot.date,
            members,
        })
    }

    /// Forgets every memoized selection. Called whenever the underlying prices may differ.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// `select`, memoized per date. Failures are not cached.
    pub fn select_cached(&mut self, snapshot: &PriceSnapshot) -> Result<Constituency, IndexError> {
        if let Some(hit) = self.cache.get(&snapshot.date) {
            return Ok(hit.clone());
        }
        let constituency = self.select(snapshot)?;
        self.cache.insert(snapshot.date, constituency.clone());
        Ok(constituency)
    }
}
