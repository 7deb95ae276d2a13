//! Card attributes as returned by the directory

use cardgate_core::Amount;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a payment card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    /// Active, usable for transactions.
    Active,
    /// Issued but not yet activated.
    Inactive,
    /// Blocked for suspicious activity or at customer request.
    Blocked,
    /// Temporarily frozen by the customer.
    Frozen,
    /// Past its expiry date.
    Expired,
    /// Reported lost.
    Lost,
    /// Reported stolen.
    Stolen,
    /// Permanently closed.
    Closed,
    PendingActivation,
    PendingReplacement,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "ACTIVE",
            CardStatus::Inactive => "INACTIVE",
            CardStatus::Blocked => "BLOCKED",
            CardStatus::Frozen => "FROZEN",
            CardStatus::Expired => "EXPIRED",
            CardStatus::Lost => "LOST",
            CardStatus::Stolen => "STOLEN",
            CardStatus::Closed => "CLOSED",
            CardStatus::PendingActivation => "PENDING_ACTIVATION",
            CardStatus::PendingReplacement => "PENDING_REPLACEMENT",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(CardStatus::Active),
            "INACTIVE" => Ok(CardStatus::Inactive),
            "BLOCKED" => Ok(CardStatus::Blocked),
            "FROZEN" => Ok(CardStatus::Frozen),
            "EXPIRED" => Ok(CardStatus::Expired),
            "LOST" => Ok(CardStatus::Lost),
            "STOLEN" => Ok(CardStatus::Stolen),
            "CLOSED" => Ok(CardStatus::Closed),
            "PENDING_ACTIVATION" => Ok(CardStatus::PendingActivation),
            "PENDING_REPLACEMENT" => Ok(CardStatus::PendingReplacement),
            other => Err(format!("unknown card status: {other}")),
        }
    }
}

/// Per-card limit set. Any field left `None` falls through to the next
/// source in the resolution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardLimits {
    pub single_transaction: Option<Amount>,
    pub daily: Option<Amount>,
    pub monthly: Option<Amount>,
    pub atm_daily: Option<Amount>,
    pub contactless: Option<Amount>,
    pub online: Option<Amount>,
}

/// A temporary limit override granted on a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOverride {
    pub limits: CardLimits,
    /// Override ignored once past this instant; `None` means open-ended.
    pub expires_at: Option<DateTime<Utc>>,
}

impl LimitOverride {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// Card attributes returned by the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub card_id: i64,
    pub masked_pan: String,
    pub pan_hash: Option<String>,
    pub token: Option<String>,
    pub bin: String,
    pub card_type: String,
    pub card_brand: String,
    pub status: CardStatus,
    pub cardholder_name: String,
    pub expiry_date: NaiveDate,
    pub issue_date: NaiveDate,
    pub account_id: i64,
    pub account_space_id: Option<i64>,
    pub customer_id: i64,
    /// `"Y"` when the card is enrolled in 3-DS.
    pub three_ds_enrollment_status: Option<String>,
    pub limit_override: Option<LimitOverride>,
    pub card_limits: Option<CardLimits>,
    pub product_code: Option<String>,
    pub issuer_country: Option<String>,
}

impl CardDetails {
    /// True iff the directory reports the card enrolled in 3-DS.
    pub fn is_enrolled_in_3ds(&self) -> bool {
        self.three_ds_enrollment_status.as_deref() == Some("Y")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_3ds_enrollment_flag() {
        let mut card = sample_card();
        assert!(card.is_enrolled_in_3ds());

        card.three_ds_enrollment_status = Some("N".into());
        assert!(!card.is_enrolled_in_3ds());

        card.three_ds_enrollment_status = None;
        assert!(!card.is_enrolled_in_3ds());
    }

    #[test]
    fn test_limit_override_expiry() {
        let now = Utc::now();
        let expired = LimitOverride {
            limits: CardLimits::default(),
            expires_at: Some(now - Duration::hours(1)),
        };
        assert!(!expired.is_active(now));

        let open_ended = LimitOverride {
            limits: CardLimits::default(),
            expires_at: None,
        };
        assert!(open_ended.is_active(now));
    }

    #[test]
    fn test_card_status_roundtrip() {
        for status in [
            CardStatus::Active,
            CardStatus::Lost,
            CardStatus::Stolen,
            CardStatus::PendingReplacement,
        ] {
            assert_eq!(status.as_str().parse::<CardStatus>(), Ok(status));
        }
    }

    fn sample_card() -> CardDetails {
        CardDetails {
            card_id: 500_000_000_001,
            masked_pan: "411111******1111".into(),
            pan_hash: Some("a1b2c3d4".into()),
            token: None,
            bin: "411111".into(),
            card_type: "DEBIT".into(),
            card_brand: "VISA".into(),
            status: CardStatus::Active,
            cardholder_name: "JOHN DOE".into(),
            expiry_date: NaiveDate::from_ymd_opt(2028, 12, 31).unwrap(),
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            account_id: 400_000_000_001,
            account_space_id: None,
            customer_id: 600_000_000_001,
            three_ds_enrollment_status: Some("Y".into()),
            limit_override: None,
            card_limits: None,
            product_code: Some("GOLD_REWARDS".into()),
            issuer_country: Some("USA".into()),
        }
    }
}
