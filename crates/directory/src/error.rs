//! Card directory errors

use cardgate_core::Transient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Card not found")]
    NotFound,

    #[error("Directory transport error: {0}")]
    Transport(String),

    #[error("Directory configuration error: {0}")]
    Configuration(String),
}

impl Transient for DirectoryError {
    fn is_transient(&self) -> bool {
        matches!(self, DirectoryError::Transport(_))
    }
}
