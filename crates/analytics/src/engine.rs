use crate::error::AnalyticsError;
use crate::report::{DayReturn, SummaryMetrics};
use core_types::{IndexPoint, RebalanceEvent};
use rust_decimal::{Decimal, MathematicalOps};

/// Annualization factor for daily series.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// A stateless calculator for deriving summary metrics from the index level series.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    /// Annual risk-free rate, spread evenly over the trading days of a year.
    risk_free_rate: Decimal,
    periods_per_year: u32,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}

impl MetricsEngine {
    pub fn new(risk_free_rate: Decimal) -> Self {
        Self {
            risk_free_rate,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }

    /// The main entry point for calculating summary metrics.
    ///
    /// # Arguments
    ///
    /// * `points` - The full, date-ordered index level series.
    /// * `events` - Every rebalance event emitted over the same date range.
    ///
    /// Undefined metrics are left as `None`; this never fails.
    pub fn calculate(&self, points: &[IndexPoint], events: &[RebalanceEvent]) -> SummaryMetrics {
        let mut report = SummaryMetrics::new();
        report.trading_days = points.len();
        report.total_rebalance_count = events
            .iter()
            .filter(|e| !e.added.is_empty() || !e.removed.is_empty())
            .count();

        if points.is_empty() {
            return report;
        }

        report.total_return = self.total_return(points).ok();
        report.max_drawdown = self.max_drawdown(points);

        let returns = self.daily_returns(points);
        self.calculate_extremes(&returns, &mut report);

        let values: Vec<Decimal> = returns.iter().map(|r| r.daily_return).collect();
        report.average_daily_return = mean(&values).ok();

        match self.annualized_volatility(&values) {
            Ok(vol) => report.annualized_volatility = Some(vol),
            Err(e) => tracing::warn!("Annualized volatility reported as null: {}", e),
        }
        match self.sharpe_ratio(&values) {
            Ok(sharpe) => report.sharpe_ratio = Some(sharpe),
            Err(e) => tracing::warn!("Sharpe ratio reported as null: {}", e),
        }

        report
    }

    /// `index_value(last) / index_value(first) - 1`.
    pub fn total_return(&self, points: &[IndexPoint]) -> Result<Decimal, AnalyticsError> {
        let (first, last) = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(AnalyticsError::NotEnoughData(
                    "total return needs at least one index point".to_string(),
                ));
            }
        };
        if first.index_value <= Decimal::ZERO {
            return Err(AnalyticsError::Calculation(format!(
                "first index value is not positive: {}",
                first.index_value
            )));
        }
        Ok(last.index_value / first.index_value - Decimal::ONE)
    }

    /// Pairwise simple returns between consecutive index points.
    pub fn daily_returns(&self, points: &[IndexPoint]) -> Vec<DayReturn> {
        points
            .windows(2)
            .filter(|w| w[0].index_value > Decimal::ZERO)
            .map(|w| DayReturn {
                date: w[1].date,
                daily_return: w[1].index_value / w[0].index_value - Decimal::ONE,
            })
            .collect()
    }

    /// Sample standard deviation of daily returns, scaled by `sqrt(252)`.
    pub fn annualized_volatility(&self, returns: &[Decimal]) -> Result<Decimal, AnalyticsError> {
        let std_dev = sample_std_dev(returns)?;
        Ok(std_dev * self.annualization()?)
    }

    /// `(mean(daily) - rf / 252) / stdev(daily) * sqrt(252)`.
    pub fn sharpe_ratio(&self, returns: &[Decimal]) -> Result<Decimal, AnalyticsError> {
        let std_dev = sample_std_dev(returns)?;
        let mean_return = mean(returns)?;
        let daily_risk_free = self.risk_free_rate / Decimal::from(self.periods_per_year);
        Ok((mean_return - daily_risk_free) / std_dev * self.annualization()?)
    }

    /// Largest peak-to-trough decline of the index level, as a fraction of the peak.
    pub fn max_drawdown(&self, points: &[IndexPoint]) -> Decimal {
        let mut max_drawdown = Decimal::ZERO;
        let Some(first) = points.first() else {
            return max_drawdown;
        };

        let mut peak = first.index_value;
        for point in points {
            if point.index_value > peak {
                peak = point.index_value;
            }
            if peak > Decimal::ZERO {
                let drawdown = (peak - point.index_value) / peak;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }
        max_drawdown
    }

    /// Best and worst days. The earliest date wins a tie.
    fn calculate_extremes(&self, returns: &[DayReturn], report: &mut SummaryMetrics) {
        for day in returns {
            match report.best_day {
                Some(best) if best.daily_return >= day.daily_return => {}
                _ => report.best_day = Some(*day),
            }
            match report.worst_day {
                Some(worst) if worst.daily_return <= day.daily_return => {}
                _ => report.worst_day = Some(*day),
            }
        }
    }

    fn annualization(&self) -> Result<Decimal, AnalyticsError> {
        Decimal::from(self.periods_per_year).sqrt().ok_or_else(|| {
            AnalyticsError::Calculation("failed to take the square root of the period count".to_string())
        })
    }
}

fn mean(values: &[Decimal]) -> Result<Decimal, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::NotEnoughData(
            "mean of an empty series".to_string(),
        ));
    }
    let sum: Decimal = values.iter().sum();
    Ok(sum / Decimal::from(values.len()))
}

fn sample_std_dev(values: &[Decimal]) -> Result<Decimal, AnalyticsError> {
    if values.len() < 2 {
        return Err(AnalyticsError::DegenerateSeries(format!(
            "need at least two daily returns, got {}",
            values.len()
        )));
    }
    let mean_value = mean(values)?;
    let variance = values
        .iter()
        .map(|v| (*v - mean_value) * (*v - mean_value))
        .sum::<Decimal>()
        / Decimal::from(values.len() - 1);

    if variance <= Decimal::ZERO {
        return Err(AnalyticsError::DegenerateSeries(
            "daily returns have zero variance".to_string(),
        ));
    }

    variance.sqrt().ok_or_else(|| {
        AnalyticsError::Calculation("Failed to calculate square root for variance".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn series(values: &[Decimal]) -> Vec<IndexPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let base = values[0];
        let mut prev = base;
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let point = IndexPoint {
                    date: start + chrono::Days::new(i as u64),
                    index_value: *v,
                    daily_return: if i == 0 { Decimal::ZERO } else { *v / prev - Decimal::ONE },
                    cumulative_return: *v / base - Decimal::ONE,
                    constituent_count: 10,
                };
                prev = *v;
                point
            })
            .collect()
    }

    fn assert_close(actual: Decimal, expected: Decimal) {
        let diff = (actual - expected).abs();
        assert!(diff < dec!(0.000000001), "{actual} != {expected}");
    }

    #[test]
    fn empty_series_yields_empty_report() {
        let report = MetricsEngine::default().calculate(&[], &[]);
        assert_eq!(report, SummaryMetrics::new());
    }

    #[test]
    fn single_point_has_zero_total_return_and_no_risk_metrics() {
        let report = MetricsEngine::default().calculate(&series(&[dec!(100)]), &[]);
        assert_eq!(report.total_return, Some(Decimal::ZERO));
        assert_eq!(report.trading_days, 1);
        assert_eq!(report.annualized_volatility, None);
        assert_eq!(report.sharpe_ratio, None);
        assert_eq!(report.best_day, None);
    }

    #[test]
    fn constant_series_reports_null_volatility_and_sharpe() {
        let points = series(&[dec!(100), dec!(100), dec!(100), dec!(100)]);
        let engine = MetricsEngine::default();
        let report = engine.calculate(&points, &[]);

        assert_eq!(report.total_return, Some(Decimal::ZERO));
        assert_eq!(report.annualized_volatility, None);
        assert_eq!(report.sharpe_ratio, None);
        assert_eq!(report.max_drawdown, Decimal::ZERO);

        let returns: Vec<Decimal> = engine
            .daily_returns(&points)
            .iter()
            .map(|r| r.daily_return)
            .collect();
        assert!(matches!(
            engine.sharpe_ratio(&returns),
            Err(AnalyticsError::DegenerateSeries(_))
        ));
    }

    #[test]
    fn volatility_and_sharpe_match_hand_computation() {
        // Daily returns: +10%, -10%, +10%.
        let points = series(&[dec!(100), dec!(110), dec!(99), dec!(108.9)]);
        let report = MetricsEngine::default().calculate(&points, &[]);

        // mean = 1/30, sample variance = 0.04/3, stdev = 0.11547005383792515...
        let sqrt_252 = dec!(15.874507866387544);
        let stdev = dec!(0.1154700538379251529);
        assert_close(report.annualized_volatility.unwrap(), stdev * sqrt_252);
        assert_close(
            report.sharpe_ratio.unwrap(),
            dec!(0.0333333333333333333) / stdev * sqrt_252,
        );
        assert_close(report.total_return.unwrap(), dec!(0.089));
        assert_close(report.max_drawdown, dec!(0.1));
    }

    #[test]
    fn risk_free_rate_lowers_sharpe() {
        let points = series(&[dec!(100), dec!(110), dec!(99), dec!(108.9)]);
        let base = MetricsEngine::new(Decimal::ZERO).calculate(&points, &[]);
        let with_rf = MetricsEngine::new(dec!(0.05)).calculate(&points, &[]);
        assert!(with_rf.sharpe_ratio.unwrap() < base.sharpe_ratio.unwrap());
    }

    #[test]
    fn best_and_worst_days_carry_dates_and_first_tie_wins() {
        let points = series(&[dec!(100), dec!(110), dec!(121), dec!(108.9)]);
        let report = MetricsEngine::default().calculate(&points, &[]);

        let best = report.best_day.unwrap();
        assert_eq!(best.date, points[1].date);
        assert_close(best.daily_return, dec!(0.1));

        let worst = report.worst_day.unwrap();
        assert_eq!(worst.date, points[3].date);
        assert_close(worst.daily_return, dec!(-0.1));
    }

    #[test]
    fn only_non_empty_events_count_as_rebalances() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let real = RebalanceEvent {
            date,
            added: BTreeSet::from(["K".to_string()]),
            removed: BTreeSet::from(["J".to_string()]),
        };
        let empty = RebalanceEvent {
            date,
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        };
        let report = MetricsEngine::default().calculate(&series(&[dec!(100), dec!(101)]), &[real, empty]);
        assert_eq!(report.total_rebalance_count, 1);
    }

    #[test]
    fn total_return_equals_compounded_daily_returns() {
        let points = series(&[dec!(100), dec!(103.7), dec!(101.2), dec!(99.95), dec!(104.31)]);
        let engine = MetricsEngine::default();
        let compounded = engine
            .daily_returns(&points)
            .iter()
            .fold(Decimal::ONE, |acc, r| acc * (Decimal::ONE + r.daily_return))
            - Decimal::ONE;
        let total = engine.total_return(&points).unwrap();
        assert!(((compounded - total) / total).abs() < dec!(0.000000001));
    }
}
