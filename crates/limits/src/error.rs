//! Limit evaluation errors

use cardgate_store::StoreError;
use thiserror::Error;

/// A limit breach or an infrastructure failure during evaluation.
///
/// The three breach variants map one-to-one onto the `EXCEEDS_*` reason
/// codes; the message differentiates channel caps from the plain
/// single-transaction limit.
#[derive(Debug, Error)]
pub enum LimitError {
    #[error("{message}")]
    ExceedsTransactionLimit { message: String },

    #[error("Transaction would exceed daily spending limit")]
    ExceedsDailyLimit,

    #[error("Transaction would exceed monthly spending limit")]
    ExceedsMonthlyLimit,

    #[error("Limit configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LimitError {
    /// True for the business-decline variants (as opposed to store or
    /// configuration failures).
    pub fn is_breach(&self) -> bool {
        matches!(
            self,
            LimitError::ExceedsTransactionLimit { .. }
                | LimitError::ExceedsDailyLimit
                | LimitError::ExceedsMonthlyLimit
        )
    }
}
