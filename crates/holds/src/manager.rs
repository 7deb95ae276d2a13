//! Hold lifecycle operations

use cardgate_core::{
    ids, Amount, AuthorizationHold, BalanceSnapshot, Clock, Currency, HoldStatus, KeyedLocks,
};
use cardgate_ledger::Ledger;
use cardgate_store::{HoldOperation, HoldRepo};
use chrono::Duration;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::HoldError;

/// Everything needed to open a hold after an approval was formed.
///
/// `amount`/`currency` are the account-currency amount the ledger will
/// reserve; the `original_*` trio carries the request side when FX
/// applied.
#[derive(Debug, Clone)]
pub struct CreateHold {
    pub request_id: i64,
    pub decision_id: i64,
    pub account_id: i64,
    pub account_space_id: Option<i64>,
    pub card_id: i64,
    pub merchant_id: String,
    pub merchant_name: String,
    pub amount: Amount,
    pub currency: Currency,
    pub original_amount: Option<Amount>,
    pub original_currency: Option<Currency>,
    pub exchange_rate: Option<Decimal>,
    pub authorization_code: String,
}

/// Result of one expiry sweep run.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Holds moved to EXPIRED.
    pub expired: Vec<i64>,
    /// Holds the sweep could not process this round, with the error text.
    pub failed: Vec<(i64, String)>,
}

/// Create / capture / release / expire, serialized per hold id.
///
/// The status flip and its ledger movement share one store transaction:
/// a ledger failure rolls the row back to ACTIVE and the operation stays
/// retryable.
pub struct HoldManager {
    pool: SqlitePool,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks<i64>,
    expiry: Duration,
}

impl HoldManager {
    pub fn new(
        pool: SqlitePool,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        expiry_hours: i64,
    ) -> Self {
        Self {
            pool,
            ledger,
            clock,
            locks: KeyedLocks::new(),
            expiry: Duration::hours(expiry_hours),
        }
    }

    /// Reserve funds and open an ACTIVE hold.
    ///
    /// The ledger reserve comes first: when it refuses (insufficient
    /// funds), no hold row exists. When the row write fails afterwards,
    /// the reserve is compensated before the error surfaces.
    pub async fn create(
        &self,
        params: CreateHold,
    ) -> Result<(AuthorizationHold, BalanceSnapshot), HoldError> {
        let snapshot = self
            .ledger
            .reserve(
                params.account_id,
                params.account_space_id,
                params.amount,
                &params.currency,
            )
            .await?;

        let now = self.clock.now();
        let hold = AuthorizationHold {
            hold_id: ids::generate_id(),
            request_id: params.request_id,
            decision_id: params.decision_id,
            account_id: params.account_id,
            account_space_id: params.account_space_id,
            card_id: params.card_id,
            merchant_id: params.merchant_id,
            merchant_name: params.merchant_name,
            amount: params.amount,
            currency: params.currency,
            original_amount: params.original_amount,
            original_currency: params.original_currency,
            exchange_rate: params.exchange_rate,
            authorization_code: params.authorization_code,
            status: HoldStatus::Active,
            captured_amount: Amount::ZERO,
            created_at: now,
            updated_at: now,
            captured_at: None,
            expires_at: now + self.expiry,
        };

        if let Err(e) = HoldRepo::insert(&self.pool, &hold).await {
            tracing::error!(
                hold_id = hold.hold_id,
                error = %e,
                "hold row write failed after reserve, compensating"
            );
            self.ledger
                .release(
                    hold.account_id,
                    hold.account_space_id,
                    hold.amount,
                    &hold.currency,
                )
                .await?;
            return Err(e.into());
        }

        tracing::info!(
            hold_id = hold.hold_id,
            request_id = hold.request_id,
            amount = %hold.amount,
            currency = %hold.currency,
            "authorization hold created"
        );
        Ok((hold, snapshot))
    }

    /// Fetch a hold by id.
    pub async fn get(&self, hold_id: i64) -> Result<AuthorizationHold, HoldError> {
        HoldRepo::find_by_hold_id(&self.pool, hold_id)
            .await?
            .ok_or(HoldError::NotFound { hold_id })
    }

    /// The hold backing a request, if any.
    pub async fn find_by_request(
        &self,
        request_id: i64,
    ) -> Result<Option<AuthorizationHold>, HoldError> {
        Ok(HoldRepo::find_by_request_id(&self.pool, request_id).await?)
    }

    /// Holds on an account, optionally filtered by status.
    pub async fn list_by_account(
        &self,
        account_id: i64,
        status: Option<HoldStatus>,
    ) -> Result<Vec<AuthorizationHold>, HoldError> {
        Ok(HoldRepo::list_by_account(&self.pool, account_id, status).await?)
    }

    /// Holds on a card.
    pub async fn list_by_card(&self, card_id: i64) -> Result<Vec<AuthorizationHold>, HoldError> {
        Ok(HoldRepo::list_by_card(&self.pool, card_id).await?)
    }

    /// Capture a hold, fully or partially.
    ///
    /// A partial capture releases the uncaptured remainder at the ledger;
    /// the captured amount is posted to the merchant ledger either way.
    /// With an operation key, re-submitting the same capture against the
    /// already-CAPTURED hold returns the current row.
    pub async fn capture(
        &self,
        hold_id: i64,
        capture_amount: Amount,
        operation_key: Option<&str>,
    ) -> Result<AuthorizationHold, HoldError> {
        let _guard = self.locks.lock(hold_id).await;
        let hold = self.get(hold_id).await?;

        if hold.status != HoldStatus::Active {
            if hold.status == HoldStatus::Captured {
                if let Some(key) = operation_key {
                    if HoldRepo::operation_matches(&self.pool, hold_id, key, HoldOperation::Capture)
                        .await?
                    {
                        return Ok(hold);
                    }
                }
            }
            return Err(HoldError::InvalidState {
                hold_id,
                current: hold.status,
            });
        }

        if capture_amount.is_zero() {
            return Err(HoldError::InvalidAmount {
                message: "capture amount must be positive".into(),
            });
        }
        if capture_amount > hold.amount {
            return Err(HoldError::InvalidAmount {
                message: format!(
                    "capture amount {} exceeds hold amount {}",
                    capture_amount, hold.amount
                ),
            });
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(cardgate_store::StoreError::from)?;

        let transitioned = HoldRepo::transition(
            &mut tx,
            hold_id,
            HoldStatus::Captured,
            Some((capture_amount, now)),
            now,
        )
        .await?;
        if !transitioned {
            return Err(HoldError::InvalidState {
                hold_id,
                current: hold.status,
            });
        }
        if let Some(key) = operation_key {
            HoldRepo::record_operation(&mut tx, hold_id, key, HoldOperation::Capture, now).await?;
        }

        // Ledger movements before commit: a ledger failure drops the
        // transaction and the hold stays ACTIVE.
        self.ledger
            .post_capture(
                hold.account_id,
                hold.account_space_id,
                capture_amount,
                &hold.currency,
                &hold.authorization_code,
            )
            .await?;

        if capture_amount < hold.amount {
            let remainder = hold.amount.saturating_sub(&capture_amount);
            self.ledger
                .release(
                    hold.account_id,
                    hold.account_space_id,
                    remainder,
                    &hold.currency,
                )
                .await?;
            tracing::info!(
                hold_id,
                captured = %capture_amount,
                released = %remainder,
                "partial capture"
            );
        } else {
            tracing::info!(hold_id, captured = %capture_amount, "full capture");
        }

        tx.commit().await.map_err(cardgate_store::StoreError::from)?;
        self.get(hold_id).await
    }

    /// Release an ACTIVE hold, returning the full amount to available.
    ///
    /// Releasing a hold that already left ACTIVE through release or
    /// expiry is a no-op returning the current row; releasing a CAPTURED
    /// hold is an invalid state.
    pub async fn release(
        &self,
        hold_id: i64,
        operation_key: Option<&str>,
    ) -> Result<AuthorizationHold, HoldError> {
        self.release_as(hold_id, HoldStatus::Released, operation_key)
            .await
    }

    /// One sweep pass: every ACTIVE hold past its expiry instant is
    /// released at the ledger and marked EXPIRED. One hold's failure
    /// never blocks the rest.
    pub async fn sweep_expired(&self) -> Result<SweepOutcome, HoldError> {
        let now = self.clock.now();
        let due = HoldRepo::find_expired(&self.pool, now).await?;

        let mut outcome = SweepOutcome::default();
        for hold in due {
            match self
                .release_as(hold.hold_id, HoldStatus::Expired, None)
                .await
            {
                Ok(_) => {
                    tracing::info!(hold_id = hold.hold_id, "expired hold released");
                    outcome.expired.push(hold.hold_id);
                }
                Err(e) => {
                    tracing::error!(hold_id = hold.hold_id, error = %e, "expiry failed");
                    outcome.failed.push((hold.hold_id, e.to_string()));
                }
            }
        }
        Ok(outcome)
    }

    async fn release_as(
        &self,
        hold_id: i64,
        target: HoldStatus,
        operation_key: Option<&str>,
    ) -> Result<AuthorizationHold, HoldError> {
        debug_assert!(matches!(
            target,
            HoldStatus::Released | HoldStatus::Expired
        ));

        let _guard = self.locks.lock(hold_id).await;
        let hold = self.get(hold_id).await?;

        match hold.status {
            HoldStatus::Active => {}
            // Release after expiry (and vice-versa) is a no-op: the funds
            // already went back to available.
            HoldStatus::Released | HoldStatus::Expired => return Ok(hold),
            HoldStatus::Captured => {
                return Err(HoldError::InvalidState {
                    hold_id,
                    current: hold.status,
                })
            }
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(cardgate_store::StoreError::from)?;

        let transitioned = HoldRepo::transition(&mut tx, hold_id, target, None, now).await?;
        if !transitioned {
            return Err(HoldError::InvalidState {
                hold_id,
                current: hold.status,
            });
        }
        if let Some(key) = operation_key {
            HoldRepo::record_operation(&mut tx, hold_id, key, HoldOperation::Release, now).await?;
        }

        self.ledger
            .release(
                hold.account_id,
                hold.account_space_id,
                hold.amount,
                &hold.currency,
            )
            .await?;

        tx.commit().await.map_err(cardgate_store::StoreError::from)?;
        self.get(hold_id).await
    }
}
