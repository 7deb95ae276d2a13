//! Authorization request - the as-received intent

use crate::amount::Amount;
use crate::currency::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Acquiring surface a transaction arrived under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionChannel {
    Pos,
    ECommerce,
    Atm,
    MobileApp,
    Contactless,
    ManualEntry,
    Recurring,
    Other,
}

impl TransactionChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionChannel::Pos => "POS",
            TransactionChannel::ECommerce => "E_COMMERCE",
            TransactionChannel::Atm => "ATM",
            TransactionChannel::MobileApp => "MOBILE_APP",
            TransactionChannel::Contactless => "CONTACTLESS",
            TransactionChannel::ManualEntry => "MANUAL_ENTRY",
            TransactionChannel::Recurring => "RECURRING",
            TransactionChannel::Other => "OTHER",
        }
    }
}

impl fmt::Display for TransactionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POS" => Ok(TransactionChannel::Pos),
            "E_COMMERCE" => Ok(TransactionChannel::ECommerce),
            "ATM" => Ok(TransactionChannel::Atm),
            "MOBILE_APP" => Ok(TransactionChannel::MobileApp),
            "CONTACTLESS" => Ok(TransactionChannel::Contactless),
            "MANUAL_ENTRY" => Ok(TransactionChannel::ManualEntry),
            "RECURRING" => Ok(TransactionChannel::Recurring),
            "OTHER" => Ok(TransactionChannel::Other),
            other => Err(format!("unknown transaction channel: {other}")),
        }
    }
}

/// What the transaction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Purchase,
    Withdrawal,
    BalanceInquiry,
    Transfer,
    Payment,
    Refund,
    PreAuthorization,
    Capture,
    Reversal,
    PinChange,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "PURCHASE",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::BalanceInquiry => "BALANCE_INQUIRY",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Refund => "REFUND",
            TransactionType::PreAuthorization => "PRE_AUTHORIZATION",
            TransactionType::Capture => "CAPTURE",
            TransactionType::Reversal => "REVERSAL",
            TransactionType::PinChange => "PIN_CHANGE",
        }
    }

    /// True when the transaction moves money, so its amount must be > 0.
    pub fn is_value_bearing(&self) -> bool {
        matches!(
            self,
            TransactionType::Purchase
                | TransactionType::Withdrawal
                | TransactionType::Transfer
                | TransactionType::Payment
                | TransactionType::Refund
                | TransactionType::PreAuthorization
                | TransactionType::Capture
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PURCHASE" => Ok(TransactionType::Purchase),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "BALANCE_INQUIRY" => Ok(TransactionType::BalanceInquiry),
            "TRANSFER" => Ok(TransactionType::Transfer),
            "PAYMENT" => Ok(TransactionType::Payment),
            "REFUND" => Ok(TransactionType::Refund),
            "PRE_AUTHORIZATION" => Ok(TransactionType::PreAuthorization),
            "CAPTURE" => Ok(TransactionType::Capture),
            "REVERSAL" => Ok(TransactionType::Reversal),
            "PIN_CHANGE" => Ok(TransactionType::PinChange),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// An authorization attempt as received from the acquiring side.
///
/// Created on intake, flipped to `processed` when a terminal decision is
/// persisted, never mutated thereafter. `request_id` is unique; the card is
/// referenced by PAN hash or token (at least one must be present).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Zero on intake means "assign one" (or derive from the idempotency
    /// key when present).
    #[serde(default)]
    pub request_id: i64,
    pub masked_pan: String,
    pub pan_hash: Option<String>,
    pub token: Option<String>,
    /// Card expiry as printed, `MM/YY`.
    pub expiry_date: String,
    pub merchant_id: String,
    pub merchant_name: String,
    pub channel: TransactionChannel,
    pub mcc: Option<String>,
    pub country_code: Option<String>,
    pub transaction_type: TransactionType,
    pub amount: Amount,
    pub currency: Currency,
    pub timestamp: DateTime<Utc>,
    pub cryptogram: Option<String>,
    pub pin_data: Option<String>,
    pub three_ds_data: Option<String>,
    pub additional_data: Option<String>,
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl AuthorizationRequest {
    /// True when the request carries at least one card reference.
    pub fn has_card_reference(&self) -> bool {
        self.pan_hash.as_deref().is_some_and(|s| !s.is_empty())
            || self.token.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// True when 3-DS authentication data accompanied the request.
    pub fn has_three_ds_data(&self) -> bool {
        self.three_ds_data.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> AuthorizationRequest {
        AuthorizationRequest {
            request_id: 123_456_789_012,
            masked_pan: "411111******1111".into(),
            pan_hash: Some("a1b2c3d4".into()),
            token: None,
            expiry_date: "12/28".into(),
            merchant_id: "MERCH123456".into(),
            merchant_name: "Test Merchant".into(),
            channel: TransactionChannel::Pos,
            mcc: Some("5411".into()),
            country_code: Some("USA".into()),
            transaction_type: TransactionType::Purchase,
            amount: Amount::new(dec!(50)).unwrap(),
            currency: Currency::Usd,
            timestamp: Utc::now(),
            cryptogram: None,
            pin_data: None,
            three_ds_data: None,
            additional_data: None,
            processed: false,
            processed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_card_reference_present() {
        let r = request();
        assert!(r.has_card_reference());

        let mut r = request();
        r.pan_hash = None;
        assert!(!r.has_card_reference());

        r.token = Some("tok_123".into());
        assert!(r.has_card_reference());
    }

    #[test]
    fn test_empty_reference_does_not_count() {
        let mut r = request();
        r.pan_hash = Some(String::new());
        r.token = None;
        assert!(!r.has_card_reference());
    }

    #[test]
    fn test_value_bearing_types() {
        assert!(TransactionType::Purchase.is_value_bearing());
        assert!(TransactionType::Withdrawal.is_value_bearing());
        assert!(!TransactionType::BalanceInquiry.is_value_bearing());
        assert!(!TransactionType::PinChange.is_value_bearing());
    }

    #[test]
    fn test_channel_roundtrip() {
        for channel in [
            TransactionChannel::Pos,
            TransactionChannel::ECommerce,
            TransactionChannel::Atm,
            TransactionChannel::Contactless,
        ] {
            assert_eq!(channel.as_str().parse::<TransactionChannel>(), Ok(channel));
        }
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&TransactionChannel::ECommerce).unwrap();
        assert_eq!(json, "\"E_COMMERCE\"");
        let json = serde_json::to_string(&TransactionType::PreAuthorization).unwrap();
        assert_eq!(json, "\"PRE_AUTHORIZATION\"");
    }
}
