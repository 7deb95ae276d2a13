//! In-memory card directory for tests and local runs

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::{CardDetails, CardDirectory, CardStatus, DirectoryError};

/// Seedable in-memory directory.
///
/// Cards are indexed by PAN hash and token. `with_demo_card` seeds the
/// single well-known test card used by local runs.
pub struct MockCardDirectory {
    by_pan_hash: RwLock<HashMap<String, CardDetails>>,
    by_token: RwLock<HashMap<String, CardDetails>>,
}

impl MockCardDirectory {
    pub fn new() -> Self {
        Self {
            by_pan_hash: RwLock::new(HashMap::new()),
            by_token: RwLock::new(HashMap::new()),
        }
    }

    /// Register a card under its PAN hash and/or token.
    pub fn insert(&self, card: CardDetails) {
        if let Some(pan_hash) = &card.pan_hash {
            self.by_pan_hash
                .write()
                .expect("directory lock poisoned")
                .insert(pan_hash.clone(), card.clone());
        }
        if let Some(token) = &card.token {
            self.by_token
                .write()
                .expect("directory lock poisoned")
                .insert(token.clone(), card);
        }
    }

    /// Directory seeded with one active VISA debit card.
    pub fn with_demo_card(pan_hash: &str) -> Self {
        let directory = Self::new();
        directory.insert(Self::demo_card(pan_hash));
        directory
    }

    /// The well-known demo card: active, 3-DS enrolled, US issued.
    pub fn demo_card(pan_hash: &str) -> CardDetails {
        let today = Utc::now().date_naive();
        CardDetails {
            card_id: 500_000_000_001,
            masked_pan: "411111******1111".into(),
            pan_hash: Some(pan_hash.into()),
            token: None,
            bin: "411111".into(),
            card_type: "DEBIT".into(),
            card_brand: "VISA".into(),
            status: CardStatus::Active,
            cardholder_name: "JOHN DOE".into(),
            expiry_date: today + Duration::days(730),
            issue_date: today - Duration::days(365),
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

impl Default for MockCardDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardDirectory for MockCardDirectory {
    async fn find_by_pan_hash(&self, pan_hash: &str) -> Result<CardDetails, DirectoryError> {
        self.by_pan_hash
            .read()
            .expect("directory lock poisoned")
            .get(pan_hash)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn find_by_token(&self, token: &str) -> Result<CardDetails, DirectoryError> {
        self.by_token
            .read()
            .expect("directory lock poisoned")
            .get(token)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }
}

/// Quick builder for a card that only differs from the demo card in a few
/// fields. Used throughout the test suites.
pub fn card_with(pan_hash: &str, mutate: impl FnOnce(&mut CardDetails)) -> CardDetails {
    let mut card = MockCardDirectory::demo_card(pan_hash);
    mutate(&mut card);
    card
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_by_pan_hash() {
        let directory = MockCardDirectory::with_demo_card("hash-1");
        let card = directory.find_by_pan_hash("hash-1").await.unwrap();
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.masked_pan, "411111******1111");
    }

    #[tokio::test]
    async fn test_lookup_by_token() {
        let directory = MockCardDirectory::new();
        directory.insert(card_with("hash-2", |c| {
            c.token = Some("tok_abc".into());
        }));

        let card = directory.find_by_token("tok_abc").await.unwrap();
        assert_eq!(card.pan_hash.as_deref(), Some("hash-2"));
    }

    #[tokio::test]
    async fn test_unknown_card_is_not_found() {
        let directory = MockCardDirectory::new();
        let result = directory.find_by_pan_hash("missing").await;
        assert!(matches!(result, Err(DirectoryError::NotFound)));
    }
}
