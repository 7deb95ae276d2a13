//! Risk assessment result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse risk bucket derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        write!(f, "{s}")
    }
}

/// What the engine recommends the orchestrator do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    Challenge,
    Decline,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Recommendation::Approve => "APPROVE",
            Recommendation::Challenge => "CHALLENGE",
            Recommendation::Decline => "DECLINE",
        };
        write!(f, "{s}")
    }
}

/// Outcome of scoring one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Capped at 100.
    pub score: i32,
    pub level: RiskLevel,
    pub recommendation: Recommendation,
    /// Names of the rules that fired, in evaluation order.
    pub triggered_rules: Vec<String>,
    pub reason: String,
}

impl RiskAssessment {
    pub fn triggered(&self, rule: &str) -> bool {
        self.triggered_rules.iter().any(|r| r == rule)
    }
}
