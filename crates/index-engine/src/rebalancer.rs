use core_types::{CompositionChange, Constituency, RebalanceEvent};
use std::collections::BTreeSet;

/// Diffs consecutive constituencies and classifies the result.
///
/// The first constituency is an `Inception`: every member counts as added, but no
/// `RebalanceEvent` is emitted, so index creation is never mistaken for a change.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexRebalancer;

impl IndexRebalancer {
    pub fn new() -> Self {
        Self
    }

    pub fn compare(&self, previous: Option<&Constituency>, current: &Constituency) -> CompositionChange {
        let current_set: BTreeSet<String> = current.symbols().map(str::to_string).collect();

        let Some(previous) = previous else {
            return CompositionChange::Inception {
                date: current.date,
                added: current_set,
            };
        };

        let previous_set: BTreeSet<String> = previous.symbols().map(str::to_string).collect();
        let added: BTreeSet<String> = current_set.difference(&previous_set).cloned().collect();
        let removed: BTreeSet<String> = previous_set.difference(&current_set).cloned().collect();

        if added.is_empty() && removed.is_empty() {
            CompositionChange::Unchanged { date: current.date }
        } else {
            CompositionChange::Rebalance(RebalanceEvent {
                date: current.date,
                added,
                removed,
            })
        }
    }
}
