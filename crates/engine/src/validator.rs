//! Card validation against the directory

use cardgate_core::{retry_with_backoff, AuthorizationRequest, Clock, ReasonCode, RetryPolicy};
use cardgate_directory::{CardDetails, CardDirectory, CardStatus, DirectoryError};
use std::sync::Arc;

use crate::AuthError;

/// Status, expiry and 3-DS checks against the card directory.
///
/// No side effects: validation only reads.
pub struct CardValidator {
    directory: Arc<dyn CardDirectory>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl CardValidator {
    pub fn new(
        directory: Arc<dyn CardDirectory>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            directory,
            clock,
            retry,
        }
    }

    /// Resolve and validate the card behind a request.
    ///
    /// Lookup prefers the PAN hash, falls back to the token, and fails
    /// validation when neither is present. The card must be ACTIVE and
    /// unexpired.
    pub async fn validate(&self, request: &AuthorizationRequest) -> Result<CardDetails, AuthError> {
        let card = self.resolve(request).await?;

        match card.status {
            CardStatus::Active => {}
            CardStatus::Expired => {
                return Err(AuthError::decline(ReasonCode::ExpiredCard, "Card has expired"));
            }
            CardStatus::Lost | CardStatus::Stolen => {
                return Err(AuthError::decline(
                    ReasonCode::CardLostStolen,
                    "Card reported lost or stolen",
                ));
            }
            other => {
                return Err(AuthError::decline(
                    ReasonCode::CardNotActive,
                    format!("Card is not active. Current status: {other}"),
                ));
            }
        }

        if card.expiry_date <= self.clock.now().date_naive() {
            return Err(AuthError::decline(ReasonCode::ExpiredCard, "Card has expired"));
        }

        Ok(card)
    }

    /// Plain lookup without status checks (used by challenge completion,
    /// which re-resolves the card it already validated).
    pub async fn resolve(&self, request: &AuthorizationRequest) -> Result<CardDetails, AuthError> {
        let lookup = if let Some(pan_hash) = request.pan_hash.as_deref().filter(|s| !s.is_empty()) {
            retry_with_backoff(self.retry, || self.directory.find_by_pan_hash(pan_hash)).await
        } else if let Some(token) = request.token.as_deref().filter(|s| !s.is_empty()) {
            retry_with_backoff(self.retry, || self.directory.find_by_token(token)).await
        } else {
            return Err(AuthError::Validation(
                "Neither PAN hash nor token provided".into(),
            ));
        };

        lookup.map_err(|e| match e {
            DirectoryError::NotFound => {
                AuthError::decline(ReasonCode::InvalidCard, "Card not found")
            }
            DirectoryError::Transport(message) => AuthError::TransientUpstream(message),
            DirectoryError::Configuration(message) => AuthError::Internal(message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardgate_core::model::request::{TransactionChannel, TransactionType};
    use cardgate_core::{Amount, Currency, ManualClock, SystemClock};
    use cardgate_directory::{card_with, MockCardDirectory};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn request(pan_hash: Option<&str>, token: Option<&str>) -> AuthorizationRequest {
        AuthorizationRequest {
            request_id: 100_000_000_001,
            masked_pan: "411111******1111".into(),
            pan_hash: pan_hash.map(String::from),
            token: token.map(String::from),
            expiry_date: "12/28".into(),
            merchant_id: "MERCH123456".into(),
            merchant_name: "Test Merchant".into(),
            channel: TransactionChannel::Pos,
            mcc: None,
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

    fn validator(directory: MockCardDirectory) -> CardValidator {
        CardValidator::new(
            Arc::new(directory),
            Arc::new(SystemClock),
            RetryPolicy::no_retry(),
        )
    }

    #[tokio::test]
    async fn test_active_card_passes() {
        let validator = validator(MockCardDirectory::with_demo_card("hash-1"));
        let card = validator
            .validate(&request(Some("hash-1"), None))
            .await
            .unwrap();
        assert_eq!(card.status, CardStatus::Active);
    }

    #[tokio::test]
    async fn test_token_fallback() {
        let directory = MockCardDirectory::new();
        directory.insert(card_with("hash-2", |c| c.token = Some("tok_abc".into())));
        let validator = validator(directory);

        let card = validator
            .validate(&request(None, Some("tok_abc")))
            .await
            .unwrap();
        assert_eq!(card.token.as_deref(), Some("tok_abc"));
    }

    #[tokio::test]
    async fn test_missing_reference_is_validation_error() {
        let validator = validator(MockCardDirectory::new());
        let result = validator.validate(&request(None, None)).await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_card_declines_invalid_card() {
        let validator = validator(MockCardDirectory::new());
        let result = validator.validate(&request(Some("missing"), None)).await;
        assert!(matches!(
            result,
            Err(AuthError::BusinessDecline {
                reason: ReasonCode::InvalidCard,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        for (status, reason) in [
            (CardStatus::Expired, ReasonCode::ExpiredCard),
            (CardStatus::Lost, ReasonCode::CardLostStolen),
            (CardStatus::Stolen, ReasonCode::CardLostStolen),
            (CardStatus::Blocked, ReasonCode::CardNotActive),
            (CardStatus::Frozen, ReasonCode::CardNotActive),
            (CardStatus::Closed, ReasonCode::CardNotActive),
        ] {
            let directory = MockCardDirectory::new();
            directory.insert(card_with("hash-1", |c| c.status = status));
            let validator = validator(directory);

            let result = validator.validate(&request(Some("hash-1"), None)).await;
            match result {
                Err(AuthError::BusinessDecline { reason: got, .. }) => {
                    assert_eq!(got, reason, "status {status:?}")
                }
                other => panic!("expected decline for {status:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_directory_expiry_date_enforced() {
        let directory = MockCardDirectory::new();
        directory.insert(card_with("hash-1", |c| {
            c.expiry_date = Utc::now().date_naive() - Duration::days(1);
        }));
        let validator = validator(directory);

        let result = validator.validate(&request(Some("hash-1"), None)).await;
        assert!(matches!(
            result,
            Err(AuthError::BusinessDecline {
                reason: ReasonCode::ExpiredCard,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_expiry_uses_injected_clock() {
        let directory = MockCardDirectory::new();
        let expiry = Utc::now().date_naive() + Duration::days(30);
        directory.insert(card_with("hash-1", |c| c.expiry_date = expiry));

        let clock = Arc::new(ManualClock::at_system_time());
        let validator = CardValidator::new(
            Arc::new(directory),
            clock.clone(),
            RetryPolicy::no_retry(),
        );

        assert!(validator
            .validate(&request(Some("hash-1"), None))
            .await
            .is_ok());

        // Time travels past the card's expiry.
        clock.advance(Duration::days(31));
        let result = validator.validate(&request(Some("hash-1"), None)).await;
        assert!(matches!(
            result,
            Err(AuthError::BusinessDecline {
                reason: ReasonCode::ExpiredCard,
                ..
            })
        ));
    }
}
