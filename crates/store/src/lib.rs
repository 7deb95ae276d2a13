//! Cardgate Persistence
//!
//! SQLite-backed storage for the authorization core: requests (idempotency
//! anchor), decisions (outcome record), holds (reserved funds) and
//! spending windows (limit counters).
//!
//! Repos follow the repository pattern over one `SqlitePool`; methods that
//! must share a transaction with other writes take an explicit
//! `&mut SqliteConnection` instead. Decimals are stored as TEXT at the
//! canonical four-decimal scale.

pub mod decisions;
pub mod error;
pub mod holds;
pub mod requests;
pub mod schema;
pub mod windows;

pub use decisions::DecisionRepo;
pub use error::{StoreError, StoreResult};
pub use holds::{HoldOperation, HoldRepo};
pub use requests::RequestRepo;
pub use windows::SpendingWindowRepo;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Database facade: pool ownership and schema bootstrap.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if necessary) a database at the given sqlx URL,
    /// e.g. `sqlite:data/cardgate.db?mode=rwc`.
    pub async fn open(url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await?;
        init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database for tests.
    ///
    /// A single connection, so every query sees the same memory database.
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> StoreResult<Transaction<'_, Sqlite>> {
        Ok(self.pool.begin().await?)
    }
}

/// Create tables and indices if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> StoreResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS authorization_requests (
        request_id INTEGER PRIMARY KEY,
        masked_pan TEXT NOT NULL,
        pan_hash TEXT,
        token TEXT,
        expiry_date TEXT NOT NULL,
        merchant_id TEXT NOT NULL,
        merchant_name TEXT NOT NULL,
        channel TEXT NOT NULL,
        mcc TEXT,
        country_code TEXT,
        transaction_type TEXT NOT NULL,
        amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        cryptogram TEXT,
        pin_data TEXT,
        three_ds_data TEXT,
        additional_data TEXT,
        processed INTEGER NOT NULL DEFAULT 0,
        processed_at TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS authorization_decisions (
        decision_id INTEGER PRIMARY KEY,
        request_id INTEGER NOT NULL UNIQUE REFERENCES authorization_requests(request_id),
        idempotency_key TEXT,
        decision TEXT NOT NULL,
        reason_code TEXT NOT NULL,
        reason_message TEXT NOT NULL,
        approved_amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        authorization_code TEXT,
        risk_score INTEGER,
        hold_id INTEGER,
        limits_snapshot TEXT,
        balance_snapshot TEXT,
        decision_path TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        expires_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_decisions_idempotency_key
        ON authorization_decisions(idempotency_key)
        WHERE idempotency_key IS NOT NULL",
    "CREATE TABLE IF NOT EXISTS authorization_holds (
        hold_id INTEGER PRIMARY KEY,
        request_id INTEGER NOT NULL REFERENCES authorization_requests(request_id),
        decision_id INTEGER NOT NULL,
        account_id INTEGER NOT NULL,
        account_space_id INTEGER,
        card_id INTEGER NOT NULL,
        merchant_id TEXT NOT NULL,
        merchant_name TEXT NOT NULL,
        amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        original_amount TEXT,
        original_currency TEXT,
        exchange_rate TEXT,
        authorization_code TEXT NOT NULL,
        status TEXT NOT NULL,
        captured_amount TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        captured_at TEXT,
        expires_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_holds_status_expires
        ON authorization_holds(status, expires_at)",
    "CREATE INDEX IF NOT EXISTS idx_holds_account
        ON authorization_holds(account_id)",
    "CREATE INDEX IF NOT EXISTS idx_holds_card
        ON authorization_holds(card_id)",
    "CREATE TABLE IF NOT EXISTS hold_operations (
        hold_id INTEGER NOT NULL,
        operation_key TEXT NOT NULL,
        action TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (hold_id, operation_key)
    )",
    "CREATE TABLE IF NOT EXISTS spending_windows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id INTEGER NOT NULL,
        window_type TEXT NOT NULL,
        channel TEXT,
        country_code TEXT,
        mcc TEXT,
        window_date TEXT,
        window_month INTEGER,
        window_year INTEGER,
        limit_amount TEXT NOT NULL,
        spent_amount TEXT NOT NULL,
        remaining_amount TEXT NOT NULL,
        transaction_count INTEGER NOT NULL DEFAULT 0,
        last_transaction_time TEXT,
        version INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_windows_period
        ON spending_windows(
            card_id,
            window_type,
            COALESCE(window_date, ''),
            COALESCE(window_month, 0),
            COALESCE(window_year, 0),
            COALESCE(channel, '')
        )",
    "CREATE TABLE IF NOT EXISTS spending_window_entries (
        window_id INTEGER NOT NULL REFERENCES spending_windows(id),
        request_id INTEGER NOT NULL,
        direction TEXT NOT NULL,
        amount TEXT NOT NULL,
        applied_at TEXT NOT NULL,
        PRIMARY KEY (window_id, request_id, direction)
    )",
];
