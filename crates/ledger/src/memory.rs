//! In-memory ledger for tests and local runs
//!
//! Keeps available/reserved/posted buckets per (account, space, currency)
//! behind one async mutex. The inspection methods let tests assert that
//! the reserved bucket always covers the ACTIVE holds.

use async_trait::async_trait;
use cardgate_core::{Amount, BalanceSnapshot, Clock, Currency, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{Ledger, LedgerError};

#[derive(Debug, Clone, Default)]
struct Bucket {
    available: Amount,
    reserved: Amount,
    posted: Amount,
}

type BucketKey = (i64, Option<i64>, String);

/// Inspectable in-memory ledger.
pub struct InMemoryLedger {
    buckets: Mutex<HashMap<BucketKey, Bucket>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Seed (or overwrite) the available balance of an account.
    pub async fn set_balance(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        currency: &Currency,
        available: Amount,
    ) {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(key(account_id, account_space_id, currency))
            .or_default();
        bucket.available = available;
    }

    /// Currently reserved amount for an account/currency.
    pub async fn reserved(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        currency: &Currency,
    ) -> Amount {
        let buckets = self.buckets.lock().await;
        buckets
            .get(&key(account_id, account_space_id, currency))
            .map(|b| b.reserved)
            .unwrap_or(Amount::ZERO)
    }

    /// Currently available amount for an account/currency.
    pub async fn available(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        currency: &Currency,
    ) -> Amount {
        let buckets = self.buckets.lock().await;
        buckets
            .get(&key(account_id, account_space_id, currency))
            .map(|b| b.available)
            .unwrap_or(Amount::ZERO)
    }

    /// Total posted to the merchant ledger for an account/currency.
    pub async fn posted(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        currency: &Currency,
    ) -> Amount {
        let buckets = self.buckets.lock().await;
        buckets
            .get(&key(account_id, account_space_id, currency))
            .map(|b| b.posted)
            .unwrap_or(Amount::ZERO)
    }

    fn snapshot(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        currency: &Currency,
        before: Amount,
        bucket: &Bucket,
    ) -> BalanceSnapshot {
        let ledger_balance = bucket
            .available
            .checked_add(&bucket.reserved)
            .unwrap_or(bucket.available);
        BalanceSnapshot {
            account_id,
            account_space_id,
            currency: currency.clone(),
            available_before: before,
            available_after: bucket.available,
            ledger_balance,
            total_hold_amount: bucket.reserved,
            exchange_rate: None,
            original_currency: None,
            original_amount: None,
            timestamp: self.clock.now(),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn balance(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
    ) -> Result<BalanceSnapshot, LedgerError> {
        let buckets = self.buckets.lock().await;
        // A balance read does not know the currency up front; accounts in
        // this implementation hold exactly one currency bucket.
        let (found_key, bucket) = buckets
            .iter()
            .find(|((acct, space, _), _)| *acct == account_id && *space == account_space_id)
            .ok_or(LedgerError::UnknownAccount { account_id })?;

        let currency: Currency = found_key
            .2
            .parse()
            .map_err(|_| LedgerError::UnknownAccount { account_id })?;
        Ok(self.snapshot(
            account_id,
            account_space_id,
            &currency,
            bucket.available,
            bucket,
        ))
    }

    async fn reserve(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        amount: Amount,
        currency: &Currency,
    ) -> Result<BalanceSnapshot, LedgerError> {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .get_mut(&key(account_id, account_space_id, currency))
            .ok_or(LedgerError::UnknownAccount { account_id })?;

        let before = bucket.available;
        let available = bucket.available.checked_sub(&amount).ok_or_else(|| {
            LedgerError::InsufficientFunds {
                requested: amount.to_string(),
                available: bucket.available.to_string(),
            }
        })?;
        bucket.available = available;
        bucket.reserved = bucket
            .reserved
            .checked_add(&amount)
            .expect("reserved bucket overflow");

        Ok(self.snapshot(account_id, account_space_id, currency, before, bucket))
    }

    async fn release(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        amount: Amount,
        currency: &Currency,
    ) -> Result<BalanceSnapshot, LedgerError> {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .get_mut(&key(account_id, account_space_id, currency))
            .ok_or(LedgerError::UnknownAccount { account_id })?;

        let before = bucket.available;
        bucket.reserved = bucket.reserved.saturating_sub(&amount);
        bucket.available = bucket
            .available
            .checked_add(&amount)
            .expect("available bucket overflow");

        Ok(self.snapshot(account_id, account_space_id, currency, before, bucket))
    }

    async fn post_capture(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        amount: Amount,
        currency: &Currency,
        _reference: &str,
    ) -> Result<BalanceSnapshot, LedgerError> {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .get_mut(&key(account_id, account_space_id, currency))
            .ok_or(LedgerError::UnknownAccount { account_id })?;

        let before = bucket.available;
        bucket.reserved = bucket.reserved.saturating_sub(&amount);
        bucket.posted = bucket
            .posted
            .checked_add(&amount)
            .expect("posted bucket overflow");

        Ok(self.snapshot(account_id, account_space_id, currency, before, bucket))
    }
}

fn key(account_id: i64, account_space_id: Option<i64>, currency: &Currency) -> BucketKey {
    (account_id, account_space_id, currency.code().to_string())
}
