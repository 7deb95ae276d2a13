//! Sufficient-funds check with FX conversion

use cardgate_core::{
    retry_with_backoff, Amount, AuthorizationRequest, BalanceSnapshot, Currency, ReasonCode,
    RetryPolicy,
};
use cardgate_directory::CardDetails;
use cardgate_fx::{FxError, FxProvider};
use cardgate_ledger::{Ledger, LedgerError};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::AuthError;

/// Outcome of a successful funds check.
///
/// `reserve_amount`/`reserve_currency` is what the hold manager will ask
/// the ledger to reserve - the request amount converted into the account
/// currency when they differ.
#[derive(Debug, Clone)]
pub struct FundsCheck {
    pub snapshot: BalanceSnapshot,
    pub reserve_amount: Amount,
    pub reserve_currency: Currency,
    /// (rate, original amount, original currency) when FX applied.
    pub fx: Option<(Decimal, Amount, Currency)>,
}

/// Checks available funds at the ledger, converting through the FX
/// provider when the request and account currencies differ.
pub struct BalanceChecker {
    ledger: Arc<dyn Ledger>,
    fx: Arc<dyn FxProvider>,
    retry: RetryPolicy,
}

impl BalanceChecker {
    pub fn new(ledger: Arc<dyn Ledger>, fx: Arc<dyn FxProvider>, retry: RetryPolicy) -> Self {
        Self { ledger, fx, retry }
    }

    /// Verify the account can cover the request amount.
    ///
    /// Returns `INSUFFICIENT_FUNDS` as a business decline when the
    /// (converted) amount exceeds the available balance; otherwise a
    /// snapshot with available-before, projected available-after and the
    /// FX triple when conversion applied.
    pub async fn check(
        &self,
        request: &AuthorizationRequest,
        card: &CardDetails,
    ) -> Result<FundsCheck, AuthError> {
        let snapshot = retry_with_backoff(self.retry, || {
            self.ledger.balance(card.account_id, card.account_space_id)
        })
        .await
        .map_err(map_ledger)?;

        let account_currency = snapshot.currency.clone();
        let available = snapshot.available_after;

        let (reserve_amount, fx) = if request.currency == account_currency {
            (request.amount, None)
        } else {
            let rate = retry_with_backoff(self.retry, || {
                self.fx.rate(&request.currency, &account_currency)
            })
            .await
            .map_err(map_fx)?;
            let converted = request
                .amount
                .apply_rate(rate)
                .map_err(|e| AuthError::Internal(format!("conversion failed: {e}")))?;
            (converted, Some((rate, request.amount, request.currency.clone())))
        };

        if reserve_amount > available {
            return Err(AuthError::decline(
                ReasonCode::InsufficientFunds,
                "Insufficient funds",
            ));
        }

        let projected_after = available.saturating_sub(&reserve_amount);
        let mut snapshot = BalanceSnapshot {
            available_before: available,
            available_after: projected_after,
            ..snapshot
        };
        if let Some((rate, original_amount, original_currency)) = &fx {
            snapshot = snapshot.with_conversion(*rate, *original_amount, original_currency.clone());
        }

        Ok(FundsCheck {
            snapshot,
            reserve_amount,
            reserve_currency: account_currency,
            fx,
        })
    }
}

fn map_ledger(e: LedgerError) -> AuthError {
    match e {
        LedgerError::InsufficientFunds { .. } => {
            AuthError::decline(ReasonCode::InsufficientFunds, "Insufficient funds")
        }
        LedgerError::Transport(message) => AuthError::TransientUpstream(message),
        other => AuthError::Internal(other.to_string()),
    }
}

fn map_fx(e: FxError) -> AuthError {
    match e {
        FxError::Transport(message) => AuthError::TransientUpstream(message),
        other => AuthError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardgate_core::model::request::{TransactionChannel, TransactionType};
    use cardgate_directory::card_with;
    use cardgate_fx::RateTable;
    use cardgate_ledger::InMemoryLedger;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    const ACCOUNT: i64 = 400_000_000_001;

    fn request(amount: Decimal, currency: Currency) -> AuthorizationRequest {
        AuthorizationRequest {
            request_id: 100_000_000_001,
            masked_pan: "411111******1111".into(),
            pan_hash: Some("hash-1".into()),
            token: None,
            expiry_date: "12/28".into(),
            merchant_id: "MERCH123456".into(),
            merchant_name: "Test Merchant".into(),
            channel: TransactionChannel::Pos,
            mcc: None,
            country_code: Some("USA".into()),
            transaction_type: TransactionType::Purchase,
            amount: Amount::new(amount).unwrap(),
            currency,
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

    async fn checker(balance: Decimal) -> BalanceChecker {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .set_balance(ACCOUNT, None, &Currency::Usd, Amount::new(balance).unwrap())
            .await;
        BalanceChecker::new(
            ledger,
            Arc::new(RateTable::default()),
            RetryPolicy::no_retry(),
        )
    }

    #[tokio::test]
    async fn test_sufficient_funds_same_currency() {
        let checker = checker(dec!(5000)).await;
        let card = card_with("hash-1", |_| {});

        let check = checker
            .check(&request(dec!(125.50), Currency::Usd), &card)
            .await
            .unwrap();

        assert_eq!(check.reserve_amount.value(), dec!(125.5000));
        assert_eq!(check.reserve_currency, Currency::Usd);
        assert!(check.fx.is_none());
        assert_eq!(check.snapshot.available_before.value(), dec!(5000.0000));
        assert_eq!(check.snapshot.available_after.value(), dec!(4874.5000));
    }

    #[tokio::test]
    async fn test_insufficient_funds_declines() {
        let checker = checker(dec!(100)).await;
        let card = card_with("hash-1", |_| {});

        let result = checker
            .check(&request(dec!(125.50), Currency::Usd), &card)
            .await;
        assert!(matches!(
            result,
            Err(AuthError::BusinessDecline {
                reason: ReasonCode::InsufficientFunds,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_exact_balance_passes() {
        let checker = checker(dec!(125.50)).await;
        let card = card_with("hash-1", |_| {});

        let check = checker
            .check(&request(dec!(125.50), Currency::Usd), &card)
            .await
            .unwrap();
        assert_eq!(check.snapshot.available_after, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_fx_conversion_applied() {
        // EUR request against a USD account: 50 EUR * 1.18 = 59 USD.
        let checker = checker(dec!(100)).await;
        let card = card_with("hash-1", |_| {});

        let check = checker
            .check(&request(dec!(50), Currency::Eur), &card)
            .await
            .unwrap();

        assert_eq!(check.reserve_amount.value(), dec!(59.0000));
        assert_eq!(check.reserve_currency, Currency::Usd);
        let (rate, original, original_currency) = check.fx.clone().unwrap();
        assert_eq!(rate, dec!(1.18));
        assert_eq!(original.value(), dec!(50.0000));
        assert_eq!(original_currency, Currency::Eur);
        assert_eq!(check.snapshot.exchange_rate, Some(dec!(1.18)));
        assert_eq!(check.snapshot.original_currency, Some(Currency::Eur));
    }

    #[tokio::test]
    async fn test_fx_conversion_can_exhaust_balance() {
        // 90 EUR * 1.18 = 106.20 USD > 100 USD available.
        let checker = checker(dec!(100)).await;
        let card = card_with("hash-1", |_| {});

        let result = checker.check(&request(dec!(90), Currency::Eur), &card).await;
        assert!(matches!(
            result,
            Err(AuthError::BusinessDecline {
                reason: ReasonCode::InsufficientFunds,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_rate_is_internal() {
        let checker = checker(dec!(1000)).await;
        let card = card_with("hash-1", |_| {});

        let sek: Currency = "SEK".parse().unwrap();
        let result = checker.check(&request(dec!(50), sek), &card).await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }
}
