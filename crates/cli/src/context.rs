//! Application context - wires everything together

use cardgate_core::{Amount, Clock, Currency, SystemClock};
use cardgate_directory::{CardDirectory, HttpCardDirectory, MockCardDirectory};
use cardgate_engine::{AuthorizationConfig, Authorizer, BalanceChecker, CardValidator};
use cardgate_fx::RateTable;
use cardgate_holds::HoldManager;
use cardgate_ledger::{HttpLedger, InMemoryLedger, Ledger};
use cardgate_limits::LimitEvaluator;
use cardgate_risk::RiskEngine;
use cardgate_store::Store;
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;

/// PAN hash of the seeded demo card when no card service is configured.
pub const DEMO_PAN_HASH: &str = "demo";

/// Demo account backing the seeded card, with 5000.00 USD available.
pub const DEMO_ACCOUNT_ID: i64 = 400_000_000_001;

/// Wires store, collaborators and the engine from configuration.
///
/// Externals with a configured `base_url` get HTTP clients; without one,
/// the in-process stand-ins are used (mock directory with one demo card,
/// in-memory ledger with one seeded account) so the binary works out of
/// the box.
pub struct AppContext {
    pub store: Store,
    pub holds: Arc<HoldManager>,
    pub authorizer: Authorizer,
    pub config: AuthorizationConfig,
}

impl AppContext {
    pub async fn new(data_dir: &Path, config: AuthorizationConfig) -> Result<Self, anyhow::Error> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("cardgate.db");
        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let store = Store::open(&url).await?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let card_service = &config.externals.card_service;
        let directory: Arc<dyn CardDirectory> = match &card_service.base_url {
            Some(base_url) => Arc::new(HttpCardDirectory::new(base_url, card_service.timeout())?),
            None => {
                tracing::info!("no card service configured, using demo directory");
                Arc::new(MockCardDirectory::with_demo_card(DEMO_PAN_HASH))
            }
        };

        let ledger_config = &config.externals.ledger;
        let ledger: Arc<dyn Ledger> = match &ledger_config.base_url {
            Some(base_url) => Arc::new(HttpLedger::new(base_url, ledger_config.timeout())?),
            None => {
                tracing::info!("no ledger configured, using in-memory ledger");
                let ledger = InMemoryLedger::new();
                ledger
                    .set_balance(
                        DEMO_ACCOUNT_ID,
                        None,
                        &Currency::Usd,
                        Amount::new(Decimal::new(5_000, 0)).expect("demo balance"),
                    )
                    .await;
                Arc::new(ledger)
            }
        };

        let holds = Arc::new(HoldManager::new(
            store.pool().clone(),
            ledger.clone(),
            clock.clone(),
            config.hold_expiry_hours,
        ));

        let validator = CardValidator::new(
            directory,
            clock.clone(),
            card_service.retry_policy(),
        );
        let limits = LimitEvaluator::new(store.pool().clone(), config.limits.clone(), clock.clone());
        let balance = BalanceChecker::new(
            ledger,
            Arc::new(RateTable::default()),
            ledger_config.retry_policy(),
        );
        let risk = RiskEngine::new(config.risk.clone());

        let authorizer = Authorizer::new(
            store.pool().clone(),
            validator,
            limits,
            risk,
            balance,
            holds.clone(),
            clock,
            config.deadline(),
        );

        Ok(Self {
            store,
            holds,
            authorizer,
            config,
        })
    }
}
