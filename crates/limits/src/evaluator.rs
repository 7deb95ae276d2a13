//! Limit evaluation and spending-counter commit

use cardgate_core::{
    Amount, AuthorizationRequest, Clock, LimitSnapshot, TransactionChannel,
};
use cardgate_directory::{CardDetails, CardLimits};
use cardgate_store::SpendingWindowRepo;
use chrono::{DateTime, Datelike, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;

use crate::{LimitConfig, LimitError};

/// Limits in force for one card, after source resolution.
///
/// Resolution order per field: active non-expired override on the card,
/// the card's own limits, the product-code table, the configured default.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveLimits {
    pub single_transaction: Amount,
    pub daily: Amount,
    pub monthly: Amount,
    pub atm_daily: Amount,
    pub contactless: Amount,
    pub online: Amount,
}

impl EffectiveLimits {
    pub fn resolve(card: &CardDetails, config: &LimitConfig, now: DateTime<Utc>) -> Self {
        let override_limits = card
            .limit_override
            .as_ref()
            .filter(|o| o.is_active(now))
            .map(|o| &o.limits);
        let card_limits = card.card_limits.as_ref();
        let product_limits = card
            .product_code
            .as_deref()
            .and_then(|code| config.product_limits.get(code));

        let pick = |field: fn(&CardLimits) -> Option<Amount>, default: Amount| -> Amount {
            override_limits
                .and_then(field)
                .or_else(|| card_limits.and_then(field))
                .or_else(|| product_limits.and_then(field))
                .unwrap_or(default)
        };

        Self {
            single_transaction: pick(|l| l.single_transaction, config.defaults.transaction_limit),
            daily: pick(|l| l.daily, config.defaults.daily_limit),
            monthly: pick(|l| l.monthly, config.defaults.monthly_limit),
            atm_daily: pick(|l| l.atm_daily, config.defaults.atm_daily_limit),
            contactless: pick(|l| l.contactless, config.defaults.contactless_limit),
            online: pick(|l| l.online, config.defaults.online_limit),
        }
    }
}

/// The limit evaluator (checks) and spending-counter writer (commit).
pub struct LimitEvaluator {
    pool: SqlitePool,
    config: LimitConfig,
    clock: Arc<dyn Clock>,
}

impl LimitEvaluator {
    pub fn new(pool: SqlitePool, config: LimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &LimitConfig {
        &self.config
    }

    /// Validate the request amount against every applicable limit.
    ///
    /// Checks run in strict order: single-transaction (channel-adjusted),
    /// channel caps, daily window, monthly window. On success returns the
    /// snapshot the decision will carry; nothing is committed here.
    pub async fn evaluate(
        &self,
        request: &AuthorizationRequest,
        card: &CardDetails,
    ) -> Result<LimitSnapshot, LimitError> {
        let now = self.clock.now();
        let effective = EffectiveLimits::resolve(card, &self.config, now);
        let factor = self.config.channel_multipliers.factor(request.channel);

        let adjusted_transaction = scaled(&effective.single_transaction, factor)?;
        let adjusted_daily = scaled(&effective.daily, factor)?;

        if request.amount > adjusted_transaction {
            return Err(LimitError::ExceedsTransactionLimit {
                message: "Transaction amount exceeds single transaction limit".into(),
            });
        }

        match request.channel {
            TransactionChannel::Atm if request.amount > effective.atm_daily => {
                return Err(LimitError::ExceedsTransactionLimit {
                    message: "Transaction amount exceeds ATM daily limit".into(),
                });
            }
            TransactionChannel::Contactless if request.amount > effective.contactless => {
                return Err(LimitError::ExceedsTransactionLimit {
                    message: "Transaction amount exceeds contactless limit".into(),
                });
            }
            TransactionChannel::ECommerce if request.amount > effective.online => {
                return Err(LimitError::ExceedsTransactionLimit {
                    message: "Transaction amount exceeds online limit".into(),
                });
            }
            _ => {}
        }

        let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;
        let (daily, monthly) =
            materialize_windows(&mut conn, card.card_id, &effective, now).await?;
        drop(conn);

        if !daily.accommodates(&request.amount, &adjusted_daily) {
            return Err(LimitError::ExceedsDailyLimit);
        }
        if !monthly.accommodates(&request.amount, &effective.monthly) {
            return Err(LimitError::ExceedsMonthlyLimit);
        }

        Ok(build_snapshot(
            &effective,
            adjusted_transaction,
            adjusted_daily,
            &daily.spent_amount,
            &monthly.spent_amount,
            now,
        ))
    }

    /// Read-only snapshot of a card's limits and window consumption.
    pub async fn snapshot(&self, card: &CardDetails) -> Result<LimitSnapshot, LimitError> {
        let now = self.clock.now();
        let effective = EffectiveLimits::resolve(card, &self.config, now);

        let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;
        let (daily, monthly) =
            materialize_windows(&mut conn, card.card_id, &effective, now).await?;

        Ok(build_snapshot(
            &effective,
            effective.single_transaction,
            effective.daily,
            &daily.spent_amount,
            &monthly.spent_amount,
            now,
        ))
    }

    /// Commit the spend for an approved authorization to the daily and
    /// monthly windows. Idempotent per request id; runs inside the
    /// caller's decision transaction.
    pub async fn commit_spend(
        &self,
        conn: &mut SqliteConnection,
        card: &CardDetails,
        request_id: i64,
        amount: Amount,
    ) -> Result<(), LimitError> {
        let now = self.clock.now();
        let effective = EffectiveLimits::resolve(card, &self.config, now);

        let (daily, monthly) = materialize_windows(conn, card.card_id, &effective, now).await?;
        SpendingWindowRepo::apply_spend(&mut *conn, &daily, request_id, amount, now).await?;
        SpendingWindowRepo::apply_spend(&mut *conn, &monthly, request_id, amount, now).await?;
        Ok(())
    }

    /// Reverse a previously committed spend, clamping at zero. Only
    /// touches windows that exist for the current period; a reversal
    /// landing after rollover has nothing to subtract from.
    pub async fn reverse_spend(
        &self,
        conn: &mut SqliteConnection,
        card_id: i64,
        request_id: i64,
        amount: Amount,
    ) -> Result<(), LimitError> {
        let now = self.clock.now();
        let today = now.date_naive();

        if let Some(daily) =
            SpendingWindowRepo::find_daily_on_conn(&mut *conn, card_id, today).await?
        {
            SpendingWindowRepo::reverse_spend(&mut *conn, &daily, request_id, amount, now).await?;
        } else {
            tracing::debug!(card_id, request_id, "no daily window to reverse");
        }

        let (month, year) = (today.month() as i32, today.year());
        if let Some(monthly) =
            SpendingWindowRepo::find_monthly_on_conn(&mut *conn, card_id, month, year).await?
        {
            SpendingWindowRepo::reverse_spend(&mut *conn, &monthly, request_id, amount, now)
                .await?;
        }
        Ok(())
    }
}

async fn materialize_windows(
    conn: &mut SqliteConnection,
    card_id: i64,
    effective: &EffectiveLimits,
    now: DateTime<Utc>,
) -> Result<
    (
        cardgate_core::SpendingWindow,
        cardgate_core::SpendingWindow,
    ),
    LimitError,
> {
    let today = now.date_naive();
    let daily =
        SpendingWindowRepo::get_or_create_daily(&mut *conn, card_id, today, effective.daily, now)
            .await?;
    let monthly = SpendingWindowRepo::get_or_create_monthly(
        &mut *conn,
        card_id,
        today.month() as i32,
        today.year(),
        effective.monthly,
        now,
    )
    .await?;
    Ok((daily, monthly))
}

fn build_snapshot(
    effective: &EffectiveLimits,
    transaction_limit: Amount,
    daily_limit: Amount,
    daily_spent: &Amount,
    monthly_spent: &Amount,
    now: DateTime<Utc>,
) -> LimitSnapshot {
    LimitSnapshot {
        daily_limit,
        daily_spent: *daily_spent,
        daily_remaining: daily_limit.saturating_sub(daily_spent),
        monthly_limit: effective.monthly,
        monthly_spent: *monthly_spent,
        monthly_remaining: effective.monthly.saturating_sub(monthly_spent),
        single_transaction_limit: transaction_limit,
        atm_daily_limit: effective.atm_daily,
        contactless_limit: effective.contactless,
        online_limit: effective.online,
        snapshot_date: now.date_naive(),
    }
}

fn scaled(limit: &Amount, factor: rust_decimal::Decimal) -> Result<Amount, LimitError> {
    limit
        .apply_rate(factor)
        .map_err(|e| LimitError::Configuration(format!("channel multiplier: {e}")))
}

fn map_sqlx(e: sqlx::Error) -> LimitError {
    LimitError::Store(e.into())
}
