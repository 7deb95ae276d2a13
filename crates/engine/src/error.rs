//! Authorization error taxonomy
//!
//! Internal failures are typed; the boundary sees reason codes. Business
//! declines are not errors in the operational sense - they become
//! persisted DECLINED decisions - but they travel through this enum until
//! the orchestrator records them.

use cardgate_core::{ReasonCode, Transient};
use cardgate_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input: missing required field, bad shape.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown decision / request / hold.
    #[error("Not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Operation not allowed in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A limit / risk / funds / card-status decline. The normal business
    /// path: persisted as a DECLINED decision, never retried.
    #[error("Declined: {message}")]
    BusinessDecline {
        reason: ReasonCode,
        message: String,
    },

    /// Retriable upstream failure that exhausted its retry budget.
    #[error("Upstream unavailable: {0}")]
    TransientUpstream(String),

    /// Unexpected failure. Any in-flight ledger reserve has been
    /// compensated by the time this surfaces.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn decline(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self::BusinessDecline {
            reason,
            message: message.into(),
        }
    }

    /// The reason code surfaced at the boundary for this failure.
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            AuthError::Validation(_) => ReasonCode::FormatError,
            AuthError::BusinessDecline { reason, .. } => *reason,
            AuthError::TransientUpstream(_) => ReasonCode::IssuerUnavailable,
            AuthError::NotFound { .. } | AuthError::InvalidState(_) | AuthError::Internal(_) => {
                ReasonCode::SystemError
            }
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => AuthError::NotFound { entity, id },
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl Transient for AuthError {
    fn is_transient(&self) -> bool {
        matches!(self, AuthError::TransientUpstream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_at_boundary() {
        assert_eq!(
            AuthError::Validation("bad".into()).reason_code(),
            ReasonCode::FormatError
        );
        assert_eq!(
            AuthError::decline(ReasonCode::InsufficientFunds, "x").reason_code(),
            ReasonCode::InsufficientFunds
        );
        assert_eq!(
            AuthError::TransientUpstream("x".into()).reason_code(),
            ReasonCode::IssuerUnavailable
        );
        assert_eq!(
            AuthError::Internal("x".into()).reason_code(),
            ReasonCode::SystemError
        );
    }

    #[test]
    fn test_store_not_found_maps_through() {
        let e: AuthError = StoreError::not_found("AuthorizationHold", 7).into();
        assert!(matches!(e, AuthError::NotFound { .. }));
    }
}
