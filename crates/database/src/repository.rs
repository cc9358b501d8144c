use crate::DbError;
use analytics::SummaryMetrics;
use chrono::NaiveDate;
use core_types::{CompositionChange, PriceObservation};
use index_engine::IndexRun;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{Row, Transaction};
use uuid::Uuid;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Saves raw observations within a single transaction.
    /// Uses `ON CONFLICT DO NOTHING` to be idempotent, so a universe can be
    /// ingested repeatedly. Returns the number of rows actually inserted.
    pub async fn save_price_observations(
        &self,
        observations: &[PriceObservation],
    ) -> Result<u64, DbError> {
        let mut tx: Transaction<Postgres> = self.pool.begin().await?;
        let mut inserted = 0;

        for obs in observations {
            let result = sqlx::query(
                r#"
                INSERT INTO price_observations (symbol, date, adjusted_close, shares_outstanding, reported_market_cap)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (symbol, date) DO NOTHING
                "#,
            )
            .bind(&obs.symbol)
            .bind(obs.date)
            .bind(obs.adjusted_close)
            .bind(obs.shares_outstanding)
            .bind(obs.reported_market_cap)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        tracing::info!(
            inserted,
            skipped = observations.len() as u64 - inserted,
            "Saved price observations"
        );
        Ok(inserted)
    }

    /// Fetches every observation within a date range, ordered by date then symbol.
    pub async fn get_observations_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, date, adjusted_close, shares_outstanding, reported_market_cap
            FROM price_observations
            WHERE date >= $1 AND date <= $2
            ORDER BY date ASC, symbol ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let observations = rows
            .into_iter()
            .map(|row| {
                Ok(PriceObservation {
                    symbol: row.try_get("symbol")?,
                    date: row.try_get("date")?,
                    adjusted_close: row.try_get("adjusted_close")?,
                    shares_outstanding: row.try_get("shares_outstanding")?,
                    reported_market_cap: row.try_get("reported_market_cap")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(observations)
    }

    /// Persists a completed run (level series, composition, change log, skipped
    /// dates and summary) under `run_id`, all within one transaction.
    pub async fn save_index_run(
        &self,
        run_id: Uuid,
        inception_date: NaiveDate,
        end_date: NaiveDate,
        constituent_count: usize,
        run: &IndexRun,
        metrics: &SummaryMetrics,
    ) -> Result<(), DbError> {
        let mut tx: Transaction<Postgres> = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO index_runs (run_id, inception_date, end_date, constituent_count, created_at) VALUES ($1, $2, $3, $4, NOW())",
        )
        .bind(run_id)
        .bind(inception_date)
        .bind(end_date)
        .bind(to_i32(constituent_count)?)
        .execute(&mut *tx)
        .await?;

        for point in &run.points {
            sqlx::query(
                r#"
                INSERT INTO index_performance (run_id, date, index_value, daily_return, cumulative_return, constituent_count)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(run_id)
            .bind(point.date)
            .bind(point.index_value)
            .bind(point.daily_return)
            .bind(point.cumulative_return)
            .bind(to_i32(point.constituent_count)?)
            .execute(&mut *tx)
            .await?;
        }

        for constituency in &run.constituencies {
            for member in &constituency.members {
                sqlx::query(
                    r#"
                    INSERT INTO index_composition (run_id, date, symbol, rank, market_cap, weight)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(run_id)
                .bind(constituency.date)
                .bind(&member.symbol)
                .bind(to_i32(member.rank)?)
                .bind(member.market_cap)
                .bind(member.weight)
                .execute(&mut *tx)
                .await?;
            }
        }

        for change in &run.changes {
            let (added, removed) = change_columns(change);
            sqlx::query(
                r#"
                INSERT INTO composition_changes (run_id, date, change_type, tickers_added, tickers_removed)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(run_id)
            .bind(change.date())
            .bind(change.change_type().to_string())
            .bind(added)
            .bind(removed)
            .execute(&mut *tx)
            .await?;
        }

        for skipped in &run.skipped {
            sqlx::query("INSERT INTO skipped_dates (run_id, date, reason) VALUES ($1, $2, $3)")
                .bind(run_id)
                .bind(skipped.date)
                .bind(skipped.reason.to_string())
                .execute(&mut *tx)
                .await?;
        }

        let report = serde_json::to_value(metrics)?;
        sqlx::query(
            r#"
            INSERT INTO summary_metrics (
                run_id, total_return, annualized_volatility, sharpe_ratio,
                max_drawdown, total_rebalance_count, trading_days, report
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(run_id)
        .bind(metrics.total_return)
        .bind(metrics.annualized_volatility)
        .bind(metrics.sharpe_ratio)
        .bind(metrics.max_drawdown)
        .bind(to_i32(metrics.total_rebalance_count)?)
        .bind(to_i32(metrics.trading_days)?)
        .bind(report)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(%run_id, points = run.points.len(), "Saved index run");
        Ok(())
    }
}

/// Added and removed tickers for the change log. Inception lists every member as added.
fn change_columns(change: &CompositionChange) -> (Vec<String>, Vec<String>) {
    match change {
        CompositionChange::Inception { added, .. } => (added.iter().cloned().collect(), Vec::new()),
        CompositionChange::Rebalance(event) => (
            event.added.iter().cloned().collect(),
            event.removed.iter().cloned().collect(),
        ),
        CompositionChange::Unchanged { .. } => (Vec::new(), Vec::new()),
    }
}

fn to_i32(value: usize) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|_| DbError::OutOfRange(format!("{value} exceeds INTEGER")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::RebalanceEvent;
    use std::collections::BTreeSet;

    #[test]
    fn change_log_columns() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let inception = CompositionChange::Inception {
            date,
            added: BTreeSet::from(["B".to_string(), "A".to_string()]),
        };
        assert_eq!(change_columns(&inception), (vec!["A".to_string(), "B".to_string()], vec![]));

        let rebalance = CompositionChange::Rebalance(RebalanceEvent {
            date,
            added: BTreeSet::from(["K".to_string()]),
            removed: BTreeSet::from(["J".to_string()]),
        });
        assert_eq!(change_columns(&rebalance), (vec!["K".to_string()], vec!["J".to_string()]));

        let unchanged = CompositionChange::Unchanged { date };
        assert_eq!(change_columns(&unchanged), (vec![], vec![]));
    }

    #[test]
    fn counts_must_fit_an_integer_column() {
        assert_eq!(to_i32(100).unwrap(), 100);
        assert!(matches!(to_i32(usize::MAX), Err(DbError::OutOfRange(_))));
    }
}
