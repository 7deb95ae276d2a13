//! Authorization decision - the binding outcome

use crate::amount::Amount;
use crate::currency::Currency;
use crate::model::snapshot::{BalanceSnapshot, LimitSnapshot};
use crate::reason::ReasonCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Terminal and intermediate decision outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    Approved,
    Declined,
    Challenge,
    Partial,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::Approved => "APPROVED",
            DecisionType::Declined => "DECLINED",
            DecisionType::Challenge => "CHALLENGE",
            DecisionType::Partial => "PARTIAL",
        }
    }

    /// True for APPROVED and PARTIAL - the outcomes backed by a hold.
    pub fn is_approval(&self) -> bool {
        matches!(self, DecisionType::Approved | DecisionType::Partial)
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DecisionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(DecisionType::Approved),
            "DECLINED" => Ok(DecisionType::Declined),
            "CHALLENGE" => Ok(DecisionType::Challenge),
            "PARTIAL" => Ok(DecisionType::Partial),
            other => Err(format!("unknown decision type: {other}")),
        }
    }
}

/// The binding outcome for one authorization request.
///
/// Exactly one decision exists per request id. A decision mutates only
/// through challenge completion (CHALLENGE -> APPROVED/DECLINED) and
/// reversal (APPROVED/PARTIAL -> DECLINED).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub decision_id: i64,
    pub request_id: i64,
    /// Full idempotency key when one was supplied, so the decision cache
    /// never relies on the folded request id alone.
    pub idempotency_key: Option<String>,
    pub decision: DecisionType,
    pub reason_code: ReasonCode,
    pub reason_message: String,
    pub approved_amount: Amount,
    pub currency: Currency,
    /// Six digits, generated only for APPROVED/PARTIAL.
    pub authorization_code: Option<String>,
    pub risk_score: Option<i32>,
    pub hold_id: Option<i64>,
    pub limits_snapshot: Option<LimitSnapshot>,
    pub balance_snapshot: Option<BalanceSnapshot>,
    /// Append-only audit trace of the pipeline steps taken.
    pub decision_path: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// 7 days out for APPROVED, 15 minutes for CHALLENGE.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthorizationDecision {
    /// Decision/reason-code consistency: approval codes appear only on
    /// approval outcomes, a hold exists iff the outcome is an approval,
    /// and declined decisions approve nothing.
    pub fn is_consistent(&self) -> bool {
        if self.reason_code.is_approval() != self.decision.is_approval() {
            return false;
        }
        if self.hold_id.is_some() != self.decision.is_approval() {
            return false;
        }
        if self.decision == DecisionType::Declined && !self.approved_amount.is_zero() {
            return false;
        }
        true
    }
}
