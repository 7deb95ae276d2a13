//! Hold manager errors

use cardgate_core::{HoldStatus, Transient};
use cardgate_ledger::LedgerError;
use cardgate_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HoldError {
    #[error("Hold not found: {hold_id}")]
    NotFound { hold_id: i64 },

    #[error("Hold {hold_id} is {current}, operation requires ACTIVE")]
    InvalidState { hold_id: i64, current: HoldStatus },

    #[error("Invalid capture amount: {message}")]
    InvalidAmount { message: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HoldError {
    /// True when the ledger refused the reserve for lack of funds.
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, HoldError::Ledger(LedgerError::InsufficientFunds { .. }))
    }
}

impl Transient for HoldError {
    fn is_transient(&self) -> bool {
        match self {
            HoldError::Ledger(e) => e.is_transient(),
            _ => false,
        }
    }
}
