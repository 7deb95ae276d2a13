//! Reason codes for authorization decisions
//!
//! The closed table of codes attached to every decision, telling the
//! acquirer why a transaction was approved, declined or challenged. Codes
//! follow the conventional two-digit response-code space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason code attached to an authorization decision.
///
/// Code 94 (`DuplicateTransaction`) doubles as the reversal reason: a
/// reversed approval is re-decided as DECLINED/94 with a message prefixed
/// `Authorization reversed:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    // Approval codes
    ApprovedTransaction,
    ApprovedWithId,
    ApprovedPartial,
    ApprovedVip,

    // Decline codes - card related
    InvalidCard,
    ExpiredCard,
    CardNotActive,
    CardRestricted,
    CardLostStolen,

    // Decline codes - limit related
    ExceedsWithdrawalLimit,
    ExceedsDailyLimit,
    ExceedsMonthlyLimit,
    ExceedsTransactionLimit,

    // Decline codes - funds related
    InsufficientFunds,
    AccountClosed,

    // Decline codes - security related
    SuspectedFraud,
    SecurityViolation,
    InvalidPin,
    ExceedsPinRetries,

    // Challenge codes
    VerificationRequired,
    AdditionalAuthenticationRequired,

    // System related
    SystemError,
    FormatError,
    DuplicateTransaction,
    IssuerUnavailable,
}

impl ReasonCode {
    /// All codes, in table order.
    pub const ALL: [ReasonCode; 25] = [
        ReasonCode::ApprovedTransaction,
        ReasonCode::ApprovedWithId,
        ReasonCode::ApprovedPartial,
        ReasonCode::ApprovedVip,
        ReasonCode::InvalidCard,
        ReasonCode::ExpiredCard,
        ReasonCode::CardNotActive,
        ReasonCode::CardRestricted,
        ReasonCode::CardLostStolen,
        ReasonCode::ExceedsWithdrawalLimit,
        ReasonCode::ExceedsDailyLimit,
        ReasonCode::ExceedsMonthlyLimit,
        ReasonCode::ExceedsTransactionLimit,
        ReasonCode::InsufficientFunds,
        ReasonCode::AccountClosed,
        ReasonCode::SuspectedFraud,
        ReasonCode::SecurityViolation,
        ReasonCode::InvalidPin,
        ReasonCode::ExceedsPinRetries,
        ReasonCode::VerificationRequired,
        ReasonCode::AdditionalAuthenticationRequired,
        ReasonCode::SystemError,
        ReasonCode::FormatError,
        ReasonCode::DuplicateTransaction,
        ReasonCode::IssuerUnavailable,
    ];

    /// Two-digit numeric code on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            ReasonCode::ApprovedTransaction => "00",
            ReasonCode::ApprovedWithId => "08",
            ReasonCode::ApprovedPartial => "10",
            ReasonCode::ApprovedVip => "11",
            ReasonCode::InvalidCard => "14",
            ReasonCode::ExpiredCard => "54",
            ReasonCode::CardNotActive => "62",
            ReasonCode::CardRestricted => "36",
            ReasonCode::CardLostStolen => "41",
            ReasonCode::ExceedsWithdrawalLimit => "61",
            ReasonCode::ExceedsDailyLimit => "65",
            ReasonCode::ExceedsMonthlyLimit => "66",
            ReasonCode::ExceedsTransactionLimit => "13",
            ReasonCode::InsufficientFunds => "51",
            ReasonCode::AccountClosed => "64",
            ReasonCode::SuspectedFraud => "59",
            ReasonCode::SecurityViolation => "63",
            ReasonCode::InvalidPin => "55",
            ReasonCode::ExceedsPinRetries => "75",
            ReasonCode::VerificationRequired => "01",
            ReasonCode::AdditionalAuthenticationRequired => "02",
            ReasonCode::SystemError => "96",
            ReasonCode::FormatError => "30",
            ReasonCode::DuplicateTransaction => "94",
            ReasonCode::IssuerUnavailable => "91",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            ReasonCode::ApprovedTransaction => "Approved transaction",
            ReasonCode::ApprovedWithId => "Approved with identification",
            ReasonCode::ApprovedPartial => "Approved for partial amount",
            ReasonCode::ApprovedVip => "Approved VIP",
            ReasonCode::InvalidCard => "Invalid card number",
            ReasonCode::ExpiredCard => "Expired card",
            ReasonCode::CardNotActive => "Card not active",
            ReasonCode::CardRestricted => "Card restricted",
            ReasonCode::CardLostStolen => "Card reported lost or stolen",
            ReasonCode::ExceedsWithdrawalLimit => "Exceeds withdrawal limit",
            ReasonCode::ExceedsDailyLimit => "Exceeds daily limit",
            ReasonCode::ExceedsMonthlyLimit => "Exceeds monthly limit",
            ReasonCode::ExceedsTransactionLimit => "Exceeds transaction limit",
            ReasonCode::InsufficientFunds => "Insufficient funds",
            ReasonCode::AccountClosed => "Account closed",
            ReasonCode::SuspectedFraud => "Suspected fraud",
            ReasonCode::SecurityViolation => "Security violation",
            ReasonCode::InvalidPin => "Invalid PIN",
            ReasonCode::ExceedsPinRetries => "Exceeds PIN retries",
            ReasonCode::VerificationRequired => "Verification required",
            ReasonCode::AdditionalAuthenticationRequired => "Additional authentication required",
            ReasonCode::SystemError => "System error",
            ReasonCode::FormatError => "Format error",
            ReasonCode::DuplicateTransaction => "Duplicate transaction",
            ReasonCode::IssuerUnavailable => "Issuer unavailable",
        }
    }

    /// True for codes that accompany an approval.
    pub fn is_approval(&self) -> bool {
        matches!(
            self,
            ReasonCode::ApprovedTransaction
                | ReasonCode::ApprovedWithId
                | ReasonCode::ApprovedPartial
                | ReasonCode::ApprovedVip
        )
    }

    /// Look up a reason code by its numeric code.
    pub fn find_by_code(code: &str) -> Option<ReasonCode> {
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }

    /// Stable name used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::ApprovedTransaction => "APPROVED_TRANSACTION",
            ReasonCode::ApprovedWithId => "APPROVED_WITH_ID",
            ReasonCode::ApprovedPartial => "APPROVED_PARTIAL",
            ReasonCode::ApprovedVip => "APPROVED_VIP",
            ReasonCode::InvalidCard => "INVALID_CARD",
            ReasonCode::ExpiredCard => "EXPIRED_CARD",
            ReasonCode::CardNotActive => "CARD_NOT_ACTIVE",
            ReasonCode::CardRestricted => "CARD_RESTRICTED",
            ReasonCode::CardLostStolen => "CARD_LOST_STOLEN",
            ReasonCode::ExceedsWithdrawalLimit => "EXCEEDS_WITHDRAWAL_LIMIT",
            ReasonCode::ExceedsDailyLimit => "EXCEEDS_DAILY_LIMIT",
            ReasonCode::ExceedsMonthlyLimit => "EXCEEDS_MONTHLY_LIMIT",
            ReasonCode::ExceedsTransactionLimit => "EXCEEDS_TRANSACTION_LIMIT",
            ReasonCode::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ReasonCode::AccountClosed => "ACCOUNT_CLOSED",
            ReasonCode::SuspectedFraud => "SUSPECTED_FRAUD",
            ReasonCode::SecurityViolation => "SECURITY_VIOLATION",
            ReasonCode::InvalidPin => "INVALID_PIN",
            ReasonCode::ExceedsPinRetries => "EXCEEDS_PIN_RETRIES",
            ReasonCode::VerificationRequired => "VERIFICATION_REQUIRED",
            ReasonCode::AdditionalAuthenticationRequired => "ADDITIONAL_AUTHENTICATION_REQUIRED",
            ReasonCode::SystemError => "SYSTEM_ERROR",
            ReasonCode::FormatError => "FORMAT_ERROR",
            ReasonCode::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            ReasonCode::IssuerUnavailable => "ISSUER_UNAVAILABLE",
        }
    }

    /// Inverse of [`as_str`].
    pub fn from_str_name(name: &str) -> Option<ReasonCode> {
        Self::ALL.iter().copied().find(|r| r.as_str() == name)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}
