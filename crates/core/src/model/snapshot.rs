//! Snapshot value objects embedded in decisions
//!
//! `LimitSnapshot` is the limit evaluator's view of a card at decision
//! time; `BalanceSnapshot` is the ledger's view of the funding account.
//! Neither is persisted on its own - they ride along on the decision row.

use crate::amount::Amount;
use crate::currency::Currency;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Effective limits and window consumption for a card at decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitSnapshot {
    pub daily_limit: Amount,
    pub daily_spent: Amount,
    pub daily_remaining: Amount,
    pub monthly_limit: Amount,
    pub monthly_spent: Amount,
    pub monthly_remaining: Amount,
    pub single_transaction_limit: Amount,
    pub atm_daily_limit: Amount,
    pub contactless_limit: Amount,
    pub online_limit: Amount,
    pub snapshot_date: NaiveDate,
}

/// The ledger's view of an account around a balance-affecting operation.
///
/// `available_after` is the projected balance once the operation lands.
/// The FX triple is present only when the request currency differed from
/// the account currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub account_id: i64,
    pub account_space_id: Option<i64>,
    pub currency: Currency,
    pub available_before: Amount,
    pub available_after: Amount,
    pub ledger_balance: Amount,
    pub total_hold_amount: Amount,
    pub exchange_rate: Option<Decimal>,
    pub original_currency: Option<Currency>,
    pub original_amount: Option<Amount>,
    pub timestamp: DateTime<Utc>,
}

impl BalanceSnapshot {
    /// Attach the FX triple to a snapshot taken in the account currency.
    pub fn with_conversion(
        mut self,
        rate: Decimal,
        original_amount: Amount,
        original_currency: Currency,
    ) -> Self {
        self.exchange_rate = Some(rate);
        self.original_amount = Some(original_amount);
        self.original_currency = Some(original_currency);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_snapshot_conversion_triple() {
        let snapshot = BalanceSnapshot {
            account_id: 1,
            account_space_id: None,
            currency: Currency::Usd,
            available_before: Amount::new(dec!(1000)).unwrap(),
            available_after: Amount::new(dec!(900)).unwrap(),
            ledger_balance: Amount::new(dec!(1000)).unwrap(),
            total_hold_amount: Amount::new(dec!(100)).unwrap(),
            exchange_rate: None,
            original_currency: None,
            original_amount: None,
            timestamp: Utc::now(),
        };

        let converted = snapshot.with_conversion(
            dec!(1.18),
            Amount::new(dec!(84.75)).unwrap(),
            Currency::Eur,
        );

        assert_eq!(converted.exchange_rate, Some(dec!(1.18)));
        assert_eq!(converted.original_currency, Some(Currency::Eur));
    }

    #[test]
    fn test_limit_snapshot_serde_roundtrip() {
        let snapshot = LimitSnapshot {
            daily_limit: Amount::new(dec!(5000)).unwrap(),
            daily_spent: Amount::ZERO,
            daily_remaining: Amount::new(dec!(5000)).unwrap(),
            monthly_limit: Amount::new(dec!(20000)).unwrap(),
            monthly_spent: Amount::ZERO,
            monthly_remaining: Amount::new(dec!(20000)).unwrap(),
            single_transaction_limit: Amount::new(dec!(2000)).unwrap(),
            atm_daily_limit: Amount::new(dec!(1000)).unwrap(),
            contactless_limit: Amount::new(dec!(100)).unwrap(),
            online_limit: Amount::new(dec!(3000)).unwrap(),
            snapshot_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: LimitSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
