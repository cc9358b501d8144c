use crate::calculator::{CalculatorState, ChainState, IndexCalculator, Step};
use crate::calendar::TradingCalendar;
use crate::error::IndexError;
use crate::rebalancer::IndexRebalancer;
use crate::selector::ConstituentSelector;
use crate::store::PriceStore;
use chrono::NaiveDate;
use configuration::IndexSettings;
use core_types::{
    CompositionChange, Constituency, IndexPoint, RebalanceEvent, SkippedDate,
};
use indicatif::{ProgressBar, ProgressStyle};

/// Departing constituents valued at their last observed price on `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleExit {
    pub date: NaiveDate,
    pub symbols: Vec<String>,
}

/// The read-only result of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRun {
    pub points: Vec<IndexPoint>,
    /// One constituency per processed date.
    pub constituencies: Vec<Constituency>,
    /// One change-log row per processed date.
    pub changes: Vec<CompositionChange>,
    pub skipped: Vec<SkippedDate>,
    pub stale_exits: Vec<StaleExit>,
    /// The terminated calculator, holding the chain as of the last processed date.
    pub final_state: CalculatorState,
}

impl IndexRun {
    pub fn rebalance_events(&self) -> Vec<RebalanceEvent> {
        self.changes
            .iter()
            .filter_map(CompositionChange::as_rebalance)
            .cloned()
            .collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn final_level(&self) -> Option<IndexPoint> {
        self.points.last().cloned()
    }

    pub fn final_chain(&self) -> Option<&ChainState> {
        self.final_state.final_chain()
    }
}

/// Drives selection, rebalancing and calculation over the trading calendar.
pub struct IndexPipeline {
    selector: ConstituentSelector,
    rebalancer: IndexRebalancer,
    calculator: IndexCalculator,
    calendar: TradingCalendar,
    start: NaiveDate,
    end: NaiveDate,
}

impl IndexPipeline {
    pub fn new(
        selector: ConstituentSelector,
        calculator: IndexCalculator,
        calendar: TradingCalendar,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            selector,
            rebalancer: IndexRebalancer::new(),
            calculator,
            calendar,
            start,
            end,
        }
    }

    pub fn from_settings(settings: &IndexSettings) -> Self {
        Self::new(
            ConstituentSelector::new(settings.constituent_count, settings.shortfall_policy),
            IndexCalculator::new(settings.base_value, settings.reset_policy),
            TradingCalendar::new(settings.trading_calendar, settings.holidays.iter().copied()),
            settings.inception_date,
            settings.end_date,
        )
    }

    /// Processes every trading date in `[start, end]`, in ascending order.
    ///
    /// Date-scoped failures are logged and recorded in `IndexRun::skipped`; the
    /// previous state is carried forward. Any other failure aborts the run.
    pub fn run(&mut self, store: &dyn PriceStore) -> Result<IndexRun, IndexError> {
        // Memoized selections belong to whichever store the last run read.
        self.selector.clear_cache();
        let dates = self.calendar.dates(store, self.start, self.end);
        tracing::info!(
            start = %self.start,
            end = %self.end,
            dates = dates.len(),
            "Starting index calculation"
        );

        let progress_bar = ProgressBar::new(dates.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        let mut state = CalculatorState::Uninitialized;
        let mut run = IndexRun::default();

        // --- Main date loop ---
        for date in dates {
            match self.process_date(&state, store, date) {
                Ok((step, constituency, change)) => {
                    if let Some(event) = change.as_rebalance() {
                        tracing::info!(
                            %date,
                            "Rebalance: +{} -{} ({})",
                            event.num_added(),
                            event.num_removed(),
                            event.added.iter().cloned().collect::<Vec<_>>().join(", ")
                        );
                    }
                    tracing::debug!(
                        %date,
                        level = %step.point.index_value,
                        constituents = step.point.constituent_count,
                        "Processed date"
                    );
                    if !step.stale_exits.is_empty() {
                        run.stale_exits.push(StaleExit {
                            date,
                            symbols: step.stale_exits,
                        });
                    }
                    state = step.state;
                    run.points.push(step.point);
                    run.constituencies.push(constituency);
                    run.changes.push(change);
                }
                Err(e) => match e.skip_reason() {
                    Some(reason) => {
                        tracing::warn!(%date, "Skipping date: {}", reason);
                        run.skipped.push(SkippedDate { date, reason });
                    }
                    None => {
                        progress_bar.abandon();
                        return Err(e);
                    }
                },
            }
            progress_bar.inc(1);
        }

        progress_bar.finish_with_message("Index calculation complete.");
        run.final_state = self.calculator.terminate(state);

        if run.points.is_empty() {
            return Err(IndexError::NoValidDates {
                start: self.start,
                end: self.end,
            });
        }

        tracing::info!(
            processed = run.points.len(),
            skipped = run.skipped.len(),
            rebalances = run.rebalance_events().len(),
            "Index calculation finished"
        );
        Ok(run)
    }

    fn process_date(
        &mut self,
        state: &CalculatorState,
        store: &dyn PriceStore,
        date: NaiveDate,
    ) -> Result<(Step, Constituency, CompositionChange), IndexError> {
        let snapshot = store.get_prices(date);
        if snapshot.is_empty() {
            return Err(IndexError::NoData(date));
        }

        let constituency = self.selector.select_cached(&snapshot)?;
        let previous = state.chain().map(ChainState::constituency);
        let change = self.rebalancer.compare(previous, &constituency);
        let step = self
            .calculator
            .advance(state, &snapshot, &constituency, &change)?;
        Ok((step, constituency, change))
    }
}
