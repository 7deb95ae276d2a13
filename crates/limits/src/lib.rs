//! Cardgate Limit Evaluator
//!
//! Decides whether a candidate amount would breach any limit - single
//! transaction, channel caps, daily and monthly windows - and owns the
//! spending-counter commit/reverse that the orchestrator runs after an
//! approval or a reversal. Evaluation never commits anything.

mod config;
mod error;
mod evaluator;

pub use config::{ChannelMultipliers, DefaultLimits, LimitConfig};
pub use error::LimitError;
pub use evaluator::{EffectiveLimits, LimitEvaluator};
