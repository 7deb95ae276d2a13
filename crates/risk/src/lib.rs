//! Cardgate Risk Engine
//!
//! Rule-based risk scoring for authorization attempts. The engine is a
//! pure function over (request, card details) given its configuration:
//! each triggered rule contributes a fixed weight, the capped sum maps to
//! an APPROVE / CHALLENGE / DECLINE recommendation.

mod assessment;
mod config;
mod engine;

pub use assessment::{Recommendation, RiskAssessment, RiskLevel};
pub use config::RiskConfig;
pub use engine::RiskEngine;
