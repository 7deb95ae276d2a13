//! Row types and row <-> domain conversions
//!
//! Decimals are stored as TEXT at the canonical scale; enums as their
//! stable wire names; the snapshot and decision-path columns as JSON.

use cardgate_core::model::request::{TransactionChannel, TransactionType};
use cardgate_core::{
    Amount, AuthorizationDecision, AuthorizationHold, AuthorizationRequest, BalanceSnapshot,
    Currency, DecisionType, HoldStatus, LimitSnapshot, ReasonCode, SpendingWindow, WindowType,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{StoreError, StoreResult};

/// Row type for the `authorization_requests` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestRow {
    pub request_id: i64,
    pub masked_pan: String,
    pub pan_hash: Option<String>,
    pub token: Option<String>,
    pub expiry_date: String,
    pub merchant_id: String,
    pub merchant_name: String,
    pub channel: String,
    pub mcc: Option<String>,
    pub country_code: Option<String>,
    pub transaction_type: String,
    pub amount: String,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub cryptogram: Option<String>,
    pub pin_data: Option<String>,
    pub three_ds_data: Option<String>,
    pub additional_data: Option<String>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row type for the `authorization_decisions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DecisionRow {
    pub decision_id: i64,
    pub request_id: i64,
    pub idempotency_key: Option<String>,
    pub decision: String,
    pub reason_code: String,
    pub reason_message: String,
    pub approved_amount: String,
    pub currency: String,
    pub authorization_code: Option<String>,
    pub risk_score: Option<i32>,
    pub hold_id: Option<i64>,
    pub limits_snapshot: Option<String>,
    pub balance_snapshot: Option<String>,
    pub decision_path: String,
    pub timestamp: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type for the `authorization_holds` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HoldRow {
    pub hold_id: i64,
    pub request_id: i64,
    pub decision_id: i64,
    pub account_id: i64,
    pub account_space_id: Option<i64>,
    pub card_id: i64,
    pub merchant_id: String,
    pub merchant_name: String,
    pub amount: String,
    pub currency: String,
    pub original_amount: Option<String>,
    pub original_currency: Option<String>,
    pub exchange_rate: Option<String>,
    pub authorization_code: String,
    pub status: String,
    pub captured_amount: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

/// Row type for the `spending_windows` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SpendingWindowRow {
    pub id: i64,
    pub card_id: i64,
    pub window_type: String,
    pub channel: Option<String>,
    pub country_code: Option<String>,
    pub mcc: Option<String>,
    pub window_date: Option<NaiveDate>,
    pub window_month: Option<i32>,
    pub window_year: Option<i32>,
    pub limit_amount: String,
    pub spent_amount: String,
    pub remaining_amount: String,
    pub transaction_count: i32,
    pub last_transaction_time: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn parse_amount(field: &str, value: &str) -> StoreResult<Amount> {
    value
        .parse()
        .map_err(|_| StoreError::InvalidDecimal(format!("{field}: {value}")))
}

pub(crate) fn parse_decimal(field: &str, value: &str) -> StoreResult<Decimal> {
    value
        .parse()
        .map_err(|_| StoreError::InvalidDecimal(format!("{field}: {value}")))
}

pub(crate) fn parse_currency(value: &str) -> StoreResult<Currency> {
    value
        .parse()
        .map_err(|_| StoreError::invalid_enum("currency", value))
}

impl TryFrom<RequestRow> for AuthorizationRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> StoreResult<Self> {
        Ok(AuthorizationRequest {
            request_id: row.request_id,
            masked_pan: row.masked_pan,
            pan_hash: row.pan_hash,
            token: row.token,
            expiry_date: row.expiry_date,
            merchant_id: row.merchant_id,
            merchant_name: row.merchant_name,
            channel: row
                .channel
                .parse::<TransactionChannel>()
                .map_err(|_| StoreError::invalid_enum("channel", &row.channel))?,
            mcc: row.mcc,
            country_code: row.country_code,
            transaction_type: row
                .transaction_type
                .parse::<TransactionType>()
                .map_err(|_| StoreError::invalid_enum("transaction_type", &row.transaction_type))?,
            amount: parse_amount("amount", &row.amount)?,
            currency: parse_currency(&row.currency)?,
            timestamp: row.timestamp,
            cryptogram: row.cryptogram,
            pin_data: row.pin_data,
            three_ds_data: row.three_ds_data,
            additional_data: row.additional_data,
            processed: row.processed,
            processed_at: row.processed_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DecisionRow> for AuthorizationDecision {
    type Error = StoreError;

    fn try_from(row: DecisionRow) -> StoreResult<Self> {
        let limits_snapshot: Option<LimitSnapshot> = row
            .limits_snapshot
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let balance_snapshot: Option<BalanceSnapshot> = row
            .balance_snapshot
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let decision_path: Vec<String> = serde_json::from_str(&row.decision_path)?;

        Ok(AuthorizationDecision {
            decision_id: row.decision_id,
            request_id: row.request_id,
            idempotency_key: row.idempotency_key,
            decision: row
                .decision
                .parse::<DecisionType>()
                .map_err(|_| StoreError::invalid_enum("decision", &row.decision))?,
            reason_code: ReasonCode::from_str_name(&row.reason_code)
                .ok_or_else(|| StoreError::invalid_enum("reason_code", &row.reason_code))?,
            reason_message: row.reason_message,
            approved_amount: parse_amount("approved_amount", &row.approved_amount)?,
            currency: parse_currency(&row.currency)?,
            authorization_code: row.authorization_code,
            risk_score: row.risk_score,
            hold_id: row.hold_id,
            limits_snapshot,
            balance_snapshot,
            decision_path,
            timestamp: row.timestamp,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<HoldRow> for AuthorizationHold {
    type Error = StoreError;

    fn try_from(row: HoldRow) -> StoreResult<Self> {
        Ok(AuthorizationHold {
            hold_id: row.hold_id,
            request_id: row.request_id,
            decision_id: row.decision_id,
            account_id: row.account_id,
            account_space_id: row.account_space_id,
            card_id: row.card_id,
            merchant_id: row.merchant_id,
            merchant_name: row.merchant_name,
            amount: parse_amount("amount", &row.amount)?,
            currency: parse_currency(&row.currency)?,
            original_amount: row
                .original_amount
                .as_deref()
                .map(|v| parse_amount("original_amount", v))
                .transpose()?,
            original_currency: row
                .original_currency
                .as_deref()
                .map(parse_currency)
                .transpose()?,
            exchange_rate: row
                .exchange_rate
                .as_deref()
                .map(|v| parse_decimal("exchange_rate", v))
                .transpose()?,
            authorization_code: row.authorization_code,
            status: row
                .status
                .parse::<HoldStatus>()
                .map_err(|_| StoreError::invalid_enum("status", &row.status))?,
            captured_amount: parse_amount("captured_amount", &row.captured_amount)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            captured_at: row.captured_at,
            expires_at: row.expires_at,
        })
    }
}

impl TryFrom<SpendingWindowRow> for SpendingWindow {
    type Error = StoreError;

    fn try_from(row: SpendingWindowRow) -> StoreResult<Self> {
        Ok(SpendingWindow {
            id: row.id,
            card_id: row.card_id,
            window_type: row
                .window_type
                .parse::<WindowType>()
                .map_err(|_| StoreError::invalid_enum("window_type", &row.window_type))?,
            channel: row
                .channel
                .as_deref()
                .map(|v| {
                    v.parse::<TransactionChannel>()
                        .map_err(|_| StoreError::invalid_enum("channel", v))
                })
                .transpose()?,
            country_code: row.country_code,
            mcc: row.mcc,
            window_date: row.window_date,
            window_month: row.window_month,
            window_year: row.window_year,
            limit_amount: parse_amount("limit_amount", &row.limit_amount)?,
            spent_amount: parse_amount("spent_amount", &row.spent_amount)?,
            remaining_amount: parse_amount("remaining_amount", &row.remaining_amount)?,
            transaction_count: row.transaction_count,
            last_transaction_time: row.last_transaction_time,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
