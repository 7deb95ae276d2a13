//! Time-triggered expiry sweep

use cardgate_holds::{HoldError, HoldManager, SweepOutcome};
use std::sync::Arc;
use std::time::Duration;

/// Periodic job that expires overdue ACTIVE holds.
///
/// Delegates the actual work to the hold manager; one hold's failure is
/// logged and never blocks the rest of the sweep.
pub struct ExpirySweeper {
    holds: Arc<HoldManager>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(holds: Arc<HoldManager>, interval: Duration) -> Self {
        Self { holds, interval }
    }

    /// One sweep pass. Exposed for tests and the CLI.
    pub async fn run_once(&self) -> Result<SweepOutcome, HoldError> {
        let outcome = self.holds.sweep_expired().await?;
        if !outcome.expired.is_empty() || !outcome.failed.is_empty() {
            tracing::info!(
                expired = outcome.expired.len(),
                failed = outcome.failed.len(),
                "expiry sweep complete"
            );
        }
        Ok(outcome)
    }

    /// Run forever on the configured cadence.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                tracing::error!(error = %e, "expiry sweep failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardgate_core::model::request::{TransactionChannel, TransactionType};
    use cardgate_core::{Amount, AuthorizationRequest, Clock, Currency, ManualClock};
    use cardgate_holds::CreateHold;
    use cardgate_ledger::{InMemoryLedger, Ledger};
    use cardgate_store::{RequestRepo, Store};
    use rust_decimal_macros::dec;

    fn sample_request(request_id: i64) -> AuthorizationRequest {
        AuthorizationRequest {
            request_id,
            masked_pan: "411111******1111".into(),
            pan_hash: Some("hash-1".into()),
            token: None,
            expiry_date: "12/28".into(),
            merchant_id: "MERCH123456".into(),
            merchant_name: "Test Merchant".into(),
            channel: TransactionChannel::Pos,
            mcc: None,
            country_code: None,
            transaction_type: TransactionType::Purchase,
            amount: Amount::new(dec!(100)).unwrap(),
            currency: Currency::Usd,
            timestamp: chrono::Utc::now(),
            cryptogram: None,
            pin_data: None,
            three_ds_data: None,
            additional_data: None,
            processed: false,
            processed_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_run_once_expires_due_holds() {
        let store = Store::in_memory().await.unwrap();
        RequestRepo::insert_if_absent(store.pool(), &sample_request(100_000_000_001))
            .await
            .unwrap();
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .set_balance(1, None, &Currency::Usd, Amount::new(dec!(1000)).unwrap())
            .await;
        let clock = Arc::new(ManualClock::at_system_time());
        let holds = Arc::new(HoldManager::new(
            store.pool().clone(),
            ledger.clone() as Arc<dyn Ledger>,
            clock.clone() as Arc<dyn Clock>,
            1,
        ));

        holds
            .create(CreateHold {
                request_id: 100_000_000_001,
                decision_id: 200_000_000_001,
                account_id: 1,
                account_space_id: None,
                card_id: 500_000_000_001,
                merchant_id: "MERCH123456".into(),
                merchant_name: "Test Merchant".into(),
                amount: Amount::new(dec!(100)).unwrap(),
                currency: Currency::Usd,
                original_amount: None,
                original_currency: None,
                exchange_rate: None,
                authorization_code: "123456".into(),
            })
            .await
            .unwrap();

        let sweeper = ExpirySweeper::new(holds, Duration::from_secs(3600));

        let outcome = sweeper.run_once().await.unwrap();
        assert!(outcome.expired.is_empty());

        clock.advance(chrono::Duration::hours(2));
        let outcome = sweeper.run_once().await.unwrap();
        assert_eq!(outcome.expired.len(), 1);
    }
}
