//! Repository for authorization holds
//!
//! The status column is the money state machine's backbone: transitions
//! are guarded (`WHERE status = 'ACTIVE'`) so a hold leaves ACTIVE at most
//! once, no matter how many workers race on it.

use cardgate_core::{Amount, AuthorizationHold, HoldStatus};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::schema::HoldRow;
use crate::{StoreError, StoreResult};

/// Recorded capture/release operation, for operation-key idempotency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldOperation {
    Capture,
    Release,
}

impl HoldOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldOperation::Capture => "CAPTURE",
            HoldOperation::Release => "RELEASE",
        }
    }
}

/// Repository for the `authorization_holds` table.
pub struct HoldRepo;

impl HoldRepo {
    /// Insert a freshly created hold.
    pub async fn insert(pool: &SqlitePool, hold: &AuthorizationHold) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO authorization_holds (
                hold_id, request_id, decision_id, account_id, account_space_id,
                card_id, merchant_id, merchant_name, amount, currency,
                original_amount, original_currency, exchange_rate,
                authorization_code, status, captured_amount,
                created_at, updated_at, captured_at, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(hold.hold_id)
        .bind(hold.request_id)
        .bind(hold.decision_id)
        .bind(hold.account_id)
        .bind(hold.account_space_id)
        .bind(hold.card_id)
        .bind(&hold.merchant_id)
        .bind(&hold.merchant_name)
        .bind(hold.amount.to_string())
        .bind(hold.currency.code())
        .bind(hold.original_amount.map(|a| a.to_string()))
        .bind(hold.original_currency.as_ref().map(|c| c.code().to_string()))
        .bind(hold.exchange_rate.map(|r| r.to_string()))
        .bind(&hold.authorization_code)
        .bind(hold.status.as_str())
        .bind(hold.captured_amount.to_string())
        .bind(hold.created_at)
        .bind(hold.updated_at)
        .bind(hold.captured_at)
        .bind(hold.expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Fetch a hold by id.
    pub async fn find_by_hold_id(
        pool: &SqlitePool,
        hold_id: i64,
    ) -> StoreResult<Option<AuthorizationHold>> {
        let row =
            sqlx::query_as::<_, HoldRow>("SELECT * FROM authorization_holds WHERE hold_id = ?")
                .bind(hold_id)
                .fetch_optional(pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Fetch the hold backing a request, if any.
    pub async fn find_by_request_id(
        pool: &SqlitePool,
        request_id: i64,
    ) -> StoreResult<Option<AuthorizationHold>> {
        let row =
            sqlx::query_as::<_, HoldRow>("SELECT * FROM authorization_holds WHERE request_id = ?")
                .bind(request_id)
                .fetch_optional(pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Holds on an account, optionally filtered by status.
    pub async fn list_by_account(
        pool: &SqlitePool,
        account_id: i64,
        status: Option<HoldStatus>,
    ) -> StoreResult<Vec<AuthorizationHold>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, HoldRow>(
                    "SELECT * FROM authorization_holds
                     WHERE account_id = ? AND status = ?
                     ORDER BY created_at DESC",
                )
                .bind(account_id)
                .bind(status.as_str())
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, HoldRow>(
                    "SELECT * FROM authorization_holds
                     WHERE account_id = ?
                     ORDER BY created_at DESC",
                )
                .bind(account_id)
                .fetch_all(pool)
                .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Holds on a card.
    pub async fn list_by_card(
        pool: &SqlitePool,
        card_id: i64,
    ) -> StoreResult<Vec<AuthorizationHold>> {
        let rows = sqlx::query_as::<_, HoldRow>(
            "SELECT * FROM authorization_holds WHERE card_id = ? ORDER BY created_at DESC",
        )
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// ACTIVE holds whose expiry instant has passed.
    pub async fn find_expired(
        pool: &SqlitePool,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<AuthorizationHold>> {
        let rows = sqlx::query_as::<_, HoldRow>(
            "SELECT * FROM authorization_holds
             WHERE status = 'ACTIVE' AND expires_at < ?
             ORDER BY expires_at ASC",
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Move an ACTIVE hold into a terminal state.
    ///
    /// The update is guarded on `status = 'ACTIVE'`; returns `false` when
    /// the hold had already left ACTIVE (someone else won the race).
    /// `captured` must be provided for CAPTURED and absent otherwise.
    pub async fn transition(
        conn: &mut SqliteConnection,
        hold_id: i64,
        to: HoldStatus,
        captured: Option<(Amount, DateTime<Utc>)>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        if !to.is_terminal() {
            return Err(StoreError::conflict("AuthorizationHold", hold_id));
        }

        let result = match captured {
            Some((amount, captured_at)) => {
                sqlx::query(
                    "UPDATE authorization_holds
                     SET status = ?, captured_amount = ?, captured_at = ?, updated_at = ?
                     WHERE hold_id = ? AND status = 'ACTIVE'",
                )
                .bind(to.as_str())
                .bind(amount.to_string())
                .bind(captured_at)
                .bind(now)
                .bind(hold_id)
                .execute(&mut *conn)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE authorization_holds
                     SET status = ?, updated_at = ?
                     WHERE hold_id = ? AND status = 'ACTIVE'",
                )
                .bind(to.as_str())
                .bind(now)
                .bind(hold_id)
                .execute(&mut *conn)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    /// Record an operation key against a hold. Idempotent.
    pub async fn record_operation(
        conn: &mut SqliteConnection,
        hold_id: i64,
        operation_key: &str,
        action: HoldOperation,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO hold_operations (hold_id, operation_key, action, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(hold_id)
        .bind(operation_key)
        .bind(action.as_str())
        .bind(now)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Whether the given operation key was already applied to the hold
    /// with the same action.
    pub async fn operation_matches(
        pool: &SqlitePool,
        hold_id: i64,
        operation_key: &str,
        action: HoldOperation,
    ) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM hold_operations
             WHERE hold_id = ? AND operation_key = ? AND action = ?",
        )
        .bind(hold_id)
        .bind(operation_key)
        .bind(action.as_str())
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }
}
