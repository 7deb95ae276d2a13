//! Repository for authorization requests

use cardgate_core::AuthorizationRequest;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::schema::RequestRow;
use crate::{StoreError, StoreResult};

/// Repository for the `authorization_requests` table.
pub struct RequestRepo;

impl RequestRepo {
    /// Insert the request unless a row with its id already exists.
    ///
    /// Returns `true` when a row was written. An existing row is not an
    /// error: it is the crash-recovery path (request persisted, decision
    /// not yet) and the duplicate-submission path.
    pub async fn insert_if_absent(
        pool: &SqlitePool,
        request: &AuthorizationRequest,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO authorization_requests (
                request_id, masked_pan, pan_hash, token, expiry_date,
                merchant_id, merchant_name, channel, mcc, country_code,
                transaction_type, amount, currency, timestamp,
                cryptogram, pin_data, three_ds_data, additional_data,
                processed, processed_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.request_id)
        .bind(&request.masked_pan)
        .bind(&request.pan_hash)
        .bind(&request.token)
        .bind(&request.expiry_date)
        .bind(&request.merchant_id)
        .bind(&request.merchant_name)
        .bind(request.channel.as_str())
        .bind(&request.mcc)
        .bind(&request.country_code)
        .bind(request.transaction_type.as_str())
        .bind(request.amount.to_string())
        .bind(request.currency.code())
        .bind(request.timestamp)
        .bind(&request.cryptogram)
        .bind(&request.pin_data)
        .bind(&request.three_ds_data)
        .bind(&request.additional_data)
        .bind(request.processed)
        .bind(request.processed_at)
        .bind(request.created_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch a request by id.
    pub async fn find_by_request_id(
        pool: &SqlitePool,
        request_id: i64,
    ) -> StoreResult<AuthorizationRequest> {
        let row = sqlx::query_as::<_, RequestRow>(
            "SELECT * FROM authorization_requests WHERE request_id = ?",
        )
        .bind(request_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::not_found("AuthorizationRequest", request_id))?;

        row.try_into()
    }

    /// Whether a request with this id exists.
    pub async fn exists(pool: &SqlitePool, request_id: i64) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM authorization_requests WHERE request_id = ?",
        )
        .bind(request_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    /// Flip the request to processed. Runs inside the decision transaction.
    pub async fn mark_processed(
        conn: &mut SqliteConnection,
        request_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE authorization_requests
             SET processed = 1, processed_at = ?
             WHERE request_id = ?",
        )
        .bind(now)
        .bind(request_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("AuthorizationRequest", request_id));
        }
        Ok(())
    }
}
