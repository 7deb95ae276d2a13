//! Cardgate Authorization Engine
//!
//! The orchestrated authorization pipeline: card validation, limit
//! evaluation, risk assessment, balance check with FX, hold creation and
//! the atomic decision commit - plus reversal, challenge completion and
//! the time-triggered expiry sweep.

mod balance;
mod config;
mod error;
mod orchestrator;
mod sweeper;
mod validator;

pub use balance::{BalanceChecker, FundsCheck};
pub use config::{
    AuthorizationConfig, ExternalServiceConfig, ExternalsConfig, RetryConfig, SweepConfig,
};
pub use error::AuthError;
pub use orchestrator::Authorizer;
pub use sweeper::ExpirySweeper;
pub use validator::CardValidator;
