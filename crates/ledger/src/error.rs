//! Ledger errors

use cardgate_core::Transient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: String,
        available: String,
    },

    #[error("Unknown account: {account_id}")]
    UnknownAccount { account_id: i64 },

    #[error("Ledger transport error: {0}")]
    Transport(String),

    #[error("Ledger configuration error: {0}")]
    Configuration(String),
}

impl Transient for LedgerError {
    fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transport(_))
    }
}
