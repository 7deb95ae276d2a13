//! Cardgate Core - Domain types
//!
//! This crate contains the fundamental types shared across cardgate:
//! - `Amount`: Non-negative fixed-point decimal (four fractional digits)
//! - `Currency`: Type-safe ISO-4217 currency codes
//! - `ReasonCode`: The closed table of authorization reason codes
//! - Domain entities: request, decision, hold, spending window
//! - `Clock`: pluggable time source
//! - `KeyedLocks`: per-key async serialization
//! - `retry`: bounded retry with backoff for transient upstream failures

pub mod amount;
pub mod clock;
pub mod currency;
pub mod ids;
pub mod locks;
pub mod model;
pub mod reason;
pub mod retry;

pub use amount::{Amount, AmountError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use currency::{Currency, CurrencyError};
pub use locks::KeyedLocks;
pub use model::decision::{AuthorizationDecision, DecisionType};
pub use model::hold::{AuthorizationHold, HoldStatus};
pub use model::request::{AuthorizationRequest, TransactionChannel, TransactionType};
pub use model::snapshot::{BalanceSnapshot, LimitSnapshot};
pub use model::window::{SpendingWindow, WindowType};
pub use reason::ReasonCode;
pub use retry::{retry_with_backoff, RetryPolicy, Transient};
