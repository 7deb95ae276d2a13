//! FX provider errors

use cardgate_core::{Currency, Transient};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FxError {
    #[error("No exchange rate for {from}->{to}")]
    UnknownRate { from: Currency, to: Currency },

    #[error("FX transport error: {0}")]
    Transport(String),
}

impl Transient for FxError {
    fn is_transient(&self) -> bool {
        matches!(self, FxError::Transport(_))
    }
}
