//! Spending window - period-scoped aggregate counter

use crate::amount::Amount;
use crate::model::request::TransactionChannel;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Window granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowType {
    Daily,
    Monthly,
}

impl WindowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowType::Daily => "DAILY",
            WindowType::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WindowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAILY" => Ok(WindowType::Daily),
            "MONTHLY" => Ok(WindowType::Monthly),
            other => Err(format!("unknown window type: {other}")),
        }
    }
}

/// Aggregate spend counter for one card and one period.
///
/// At most one window exists per (card, type, scope, period). Windows are
/// materialized lazily on first touch, updated on approval and reversal,
/// and never deleted by the core. `spent_amount` never goes negative, even
/// under reversal. The `version` column backs optimistic concurrency on
/// updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingWindow {
    pub id: i64,
    pub card_id: i64,
    pub window_type: WindowType,
    /// Optional scoping: a window can track one channel only.
    pub channel: Option<TransactionChannel>,
    pub country_code: Option<String>,
    pub mcc: Option<String>,
    /// Period key for DAILY windows.
    pub window_date: Option<NaiveDate>,
    /// Period key for MONTHLY windows.
    pub window_month: Option<i32>,
    pub window_year: Option<i32>,
    pub limit_amount: Amount,
    pub spent_amount: Amount,
    pub remaining_amount: Amount,
    pub transaction_count: i32,
    pub last_transaction_time: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpendingWindow {
    /// `remaining = limit - spent`, clamped at zero.
    pub fn recompute_remaining(&mut self) {
        self.remaining_amount = self.limit_amount.saturating_sub(&self.spent_amount);
    }

    /// True when adding `amount` would stay within `limit`.
    pub fn accommodates(&self, amount: &Amount, limit: &Amount) -> bool {
        match self.spent_amount.checked_add(amount) {
            Some(total) => total <= *limit,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn window(spent: Amount) -> SpendingWindow {
        let limit = Amount::new(dec!(5000)).unwrap();
        let mut w = SpendingWindow {
            id: 1,
            card_id: 500_000_000_001,
            window_type: WindowType::Daily,
            channel: None,
            country_code: None,
            mcc: None,
            window_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            window_month: None,
            window_year: None,
            limit_amount: limit,
            spent_amount: spent,
            remaining_amount: Amount::ZERO,
            transaction_count: 0,
            last_transaction_time: None,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        w.recompute_remaining();
        w
    }

    #[test]
    fn test_remaining_is_limit_minus_spent() {
        let w = window(Amount::new(dec!(1200)).unwrap());
        assert_eq!(w.remaining_amount.value(), dec!(3800.0000));
    }

    #[test]
    fn test_remaining_clamps_at_zero() {
        let w = window(Amount::new(dec!(9999)).unwrap());
        assert_eq!(w.remaining_amount, Amount::ZERO);
    }

    #[test]
    fn test_accommodates_exact_limit() {
        let w = window(Amount::new(dec!(4000)).unwrap());
        let limit = Amount::new(dec!(5000)).unwrap();

        // Exactly at the limit approves.
        assert!(w.accommodates(&Amount::new(dec!(1000)).unwrap(), &limit));
        // One minor unit over declines.
        assert!(!w.accommodates(&Amount::new(dec!(1000.0001)).unwrap(), &limit));
    }
}
