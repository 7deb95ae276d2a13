//! Repository for spending windows
//!
//! Windows are materialized lazily for the period being touched. Updates
//! are double-guarded: an entries journal makes each (window, request)
//! application idempotent, and a version column catches writers that raced
//! past the caller's card-level lock.

#[cfg(test)]
use cardgate_core::WindowType;
use cardgate_core::{Amount, SpendingWindow};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::schema::SpendingWindowRow;
use crate::{StoreError, StoreResult};

/// Repository for the `spending_windows` table.
pub struct SpendingWindowRepo;

impl SpendingWindowRepo {
    /// Fetch or lazily create the DAILY window for a card and date.
    pub async fn get_or_create_daily(
        conn: &mut SqliteConnection,
        card_id: i64,
        date: NaiveDate,
        limit: Amount,
        now: DateTime<Utc>,
    ) -> StoreResult<SpendingWindow> {
        if let Some(window) = Self::find_daily_on_conn(&mut *conn, card_id, date).await? {
            return Ok(window);
        }

        sqlx::query(
            "INSERT OR IGNORE INTO spending_windows (
                card_id, window_type, window_date, limit_amount, spent_amount,
                remaining_amount, transaction_count, version, created_at, updated_at
            ) VALUES (?, 'DAILY', ?, ?, ?, ?, 0, 0, ?, ?)",
        )
        .bind(card_id)
        .bind(date)
        .bind(limit.to_string())
        .bind(Amount::ZERO.to_string())
        .bind(limit.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Self::find_daily_on_conn(&mut *conn, card_id, date)
            .await?
            .ok_or_else(|| StoreError::not_found("SpendingWindow", format!("{card_id}/{date}")))
    }

    /// Fetch or lazily create the MONTHLY window for a card and month.
    pub async fn get_or_create_monthly(
        conn: &mut SqliteConnection,
        card_id: i64,
        month: i32,
        year: i32,
        limit: Amount,
        now: DateTime<Utc>,
    ) -> StoreResult<SpendingWindow> {
        if let Some(window) = Self::find_monthly_on_conn(&mut *conn, card_id, month, year).await? {
            return Ok(window);
        }

        sqlx::query(
            "INSERT OR IGNORE INTO spending_windows (
                card_id, window_type, window_month, window_year, limit_amount,
                spent_amount, remaining_amount, transaction_count, version,
                created_at, updated_at
            ) VALUES (?, 'MONTHLY', ?, ?, ?, ?, ?, 0, 0, ?, ?)",
        )
        .bind(card_id)
        .bind(month)
        .bind(year)
        .bind(limit.to_string())
        .bind(Amount::ZERO.to_string())
        .bind(limit.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Self::find_monthly_on_conn(&mut *conn, card_id, month, year)
            .await?
            .ok_or_else(|| {
                StoreError::not_found("SpendingWindow", format!("{card_id}/{year}-{month}"))
            })
    }

    /// Read the DAILY window for a card and date, if materialized.
    pub async fn find_daily(
        pool: &SqlitePool,
        card_id: i64,
        date: NaiveDate,
    ) -> StoreResult<Option<SpendingWindow>> {
        let mut conn = pool.acquire().await?;
        Self::find_daily_on_conn(&mut conn, card_id, date).await
    }

    /// Read the MONTHLY window for a card and month, if materialized.
    pub async fn find_monthly(
        pool: &SqlitePool,
        card_id: i64,
        month: i32,
        year: i32,
    ) -> StoreResult<Option<SpendingWindow>> {
        let mut conn = pool.acquire().await?;
        Self::find_monthly_on_conn(&mut conn, card_id, month, year).await
    }

    /// Read the DAILY window on an existing connection/transaction.
    pub async fn find_daily_on_conn(
        conn: &mut SqliteConnection,
        card_id: i64,
        date: NaiveDate,
    ) -> StoreResult<Option<SpendingWindow>> {
        let row = sqlx::query_as::<_, SpendingWindowRow>(
            "SELECT * FROM spending_windows
             WHERE card_id = ? AND window_type = 'DAILY' AND window_date = ?
               AND channel IS NULL",
        )
        .bind(card_id)
        .bind(date)
        .fetch_optional(conn)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Read the MONTHLY window on an existing connection/transaction.
    pub async fn find_monthly_on_conn(
        conn: &mut SqliteConnection,
        card_id: i64,
        month: i32,
        year: i32,
    ) -> StoreResult<Option<SpendingWindow>> {
        let row = sqlx::query_as::<_, SpendingWindowRow>(
            "SELECT * FROM spending_windows
             WHERE card_id = ? AND window_type = 'MONTHLY'
               AND window_month = ? AND window_year = ?
               AND channel IS NULL",
        )
        .bind(card_id)
        .bind(month)
        .bind(year)
        .fetch_optional(conn)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Apply a spend to a window. Idempotent per (window, request).
    ///
    /// Returns `true` when the spend was applied, `false` when this
    /// request had already been applied to this window.
    pub async fn apply_spend(
        conn: &mut SqliteConnection,
        window: &SpendingWindow,
        request_id: i64,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let journaled = sqlx::query(
            "INSERT OR IGNORE INTO spending_window_entries
                (window_id, request_id, direction, amount, applied_at)
             VALUES (?, ?, 'SPEND', ?, ?)",
        )
        .bind(window.id)
        .bind(request_id)
        .bind(amount.to_string())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if journaled.rows_affected() == 0 {
            return Ok(false);
        }

        let spent = window
            .spent_amount
            .checked_add(&amount)
            .ok_or_else(|| StoreError::InvalidDecimal("spent_amount overflow".into()))?;
        let remaining = window.limit_amount.saturating_sub(&spent);

        let updated = sqlx::query(
            "UPDATE spending_windows
             SET spent_amount = ?, remaining_amount = ?,
                 transaction_count = transaction_count + 1,
                 last_transaction_time = ?, version = version + 1, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(spent.to_string())
        .bind(remaining.to_string())
        .bind(now)
        .bind(now)
        .bind(window.id)
        .bind(window.version)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::conflict("SpendingWindow", window.id));
        }
        Ok(true)
    }

    /// Reverse a spend on a window, clamping spent at zero. Idempotent per
    /// (window, request).
    pub async fn reverse_spend(
        conn: &mut SqliteConnection,
        window: &SpendingWindow,
        request_id: i64,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let journaled = sqlx::query(
            "INSERT OR IGNORE INTO spending_window_entries
                (window_id, request_id, direction, amount, applied_at)
             VALUES (?, ?, 'REVERSE', ?, ?)",
        )
        .bind(window.id)
        .bind(request_id)
        .bind(amount.to_string())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if journaled.rows_affected() == 0 {
            return Ok(false);
        }

        let spent = window.spent_amount.saturating_sub(&amount);
        let remaining = window.limit_amount.saturating_sub(&spent);

        let updated = sqlx::query(
            "UPDATE spending_windows
             SET spent_amount = ?, remaining_amount = ?, version = version + 1, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(spent.to_string())
        .bind(remaining.to_string())
        .bind(now)
        .bind(window.id)
        .bind(window.version)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::conflict("SpendingWindow", window.id));
        }
        Ok(true)
    }
}
