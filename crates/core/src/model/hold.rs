//! Authorization hold - reserved funds behind an approval

use crate::amount::Amount;
use crate::currency::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hold lifecycle states.
///
/// ```text
/// ACTIVE --capture--> CAPTURED  (terminal)
/// ACTIVE --release--> RELEASED  (terminal)
/// ACTIVE --expire---> EXPIRED   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    Active,
    Captured,
    Released,
    Expired,
}

impl HoldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldStatus::Active => "ACTIVE",
            HoldStatus::Captured => "CAPTURED",
            HoldStatus::Released => "RELEASED",
            HoldStatus::Expired => "EXPIRED",
        }
    }

    /// Terminal states are sinks.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HoldStatus::Active)
    }

    /// The only legal transitions leave ACTIVE.
    pub fn can_transition_to(&self, next: HoldStatus) -> bool {
        matches!(self, HoldStatus::Active) && next.is_terminal()
    }
}

impl fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HoldStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // PENDING is the legacy spelling of ACTIVE on old rows.
            "ACTIVE" | "PENDING" => Ok(HoldStatus::Active),
            "CAPTURED" => Ok(HoldStatus::Captured),
            "RELEASED" => Ok(HoldStatus::Released),
            "EXPIRED" => Ok(HoldStatus::Expired),
            other => Err(format!("unknown hold status: {other}")),
        }
    }
}

/// Funds reserved at the ledger to back an approval.
///
/// `amount`/`currency` are what was actually reserved (account currency);
/// when FX applied, the request-side trio is carried in the
/// `original_*`/`exchange_rate` fields. `amount` is immutable after
/// creation and `captured_amount > 0` iff the hold is CAPTURED.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationHold {
    pub hold_id: i64,
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
    pub status: HoldStatus,
    pub captured_amount: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationHold {
    /// Structural invariants: captured amount bounded by the hold amount
    /// and positive exactly when the hold is CAPTURED.
    pub fn is_consistent(&self) -> bool {
        if self.captured_amount > self.amount {
            return false;
        }
        match self.status {
            HoldStatus::Captured => !self.captured_amount.is_zero(),
            _ => self.captured_amount.is_zero(),
        }
    }

    /// Uncaptured remainder of the hold.
    pub fn remaining(&self) -> Amount {
        self.amount.saturating_sub(&self.captured_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn hold() -> AuthorizationHold {
        AuthorizationHold {
            hold_id: 300_000_000_001,
            request_id: 100_000_000_001,
            decision_id: 200_000_000_001,
            account_id: 400_000_000_001,
            account_space_id: None,
            card_id: 500_000_000_001,
            merchant_id: "MERCH123456".into(),
            merchant_name: "Test Merchant".into(),
            amount: Amount::new(dec!(100)).unwrap(),
            currency: Currency::Usd,
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
            authorization_code: "123456".into(),
            status: HoldStatus::Active,
            captured_amount: Amount::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            captured_at: None,
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_transitions_only_leave_active() {
        assert!(HoldStatus::Active.can_transition_to(HoldStatus::Captured));
        assert!(HoldStatus::Active.can_transition_to(HoldStatus::Released));
        assert!(HoldStatus::Active.can_transition_to(HoldStatus::Expired));

        for terminal in [HoldStatus::Captured, HoldStatus::Released, HoldStatus::Expired] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(HoldStatus::Released));
            assert!(!terminal.can_transition_to(HoldStatus::Active));
        }
    }

    #[test]
    fn test_active_with_zero_captured_is_consistent() {
        assert!(hold().is_consistent());
    }

    #[test]
    fn test_captured_requires_positive_captured_amount() {
        let mut h = hold();
        h.status = HoldStatus::Captured;
        assert!(!h.is_consistent());

        h.captured_amount = Amount::new(dec!(75)).unwrap();
        assert!(h.is_consistent());
    }

    #[test]
    fn test_captured_amount_bounded_by_hold_amount() {
        let mut h = hold();
        h.status = HoldStatus::Captured;
        h.captured_amount = Amount::new(dec!(150)).unwrap();
        assert!(!h.is_consistent());
    }

    #[test]
    fn test_remaining() {
        let mut h = hold();
        h.captured_amount = Amount::new(dec!(75)).unwrap();
        assert_eq!(h.remaining().value(), dec!(25.0000));
    }

    #[test]
    fn test_legacy_pending_parses_as_active() {
        assert_eq!("PENDING".parse::<HoldStatus>(), Ok(HoldStatus::Active));
    }
}
