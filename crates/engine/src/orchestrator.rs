//! Authorization orchestrator
//!
//! Drives the validate -> limit -> risk -> balance -> hold pipeline, forms
//! and persists the decision, and enforces idempotency. Also owns the two
//! post-decision flows: reversal and challenge completion.

use cardgate_core::{
    ids, Amount, AuthorizationDecision, AuthorizationRequest, BalanceSnapshot, Clock,
    DecisionType, KeyedLocks, LimitSnapshot, ReasonCode,
};
use cardgate_directory::CardDetails;
use cardgate_holds::{CreateHold, HoldError, HoldManager};
use cardgate_limits::{LimitError, LimitEvaluator};
use cardgate_risk::{Recommendation, RiskEngine};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use cardgate_store::{DecisionRepo, RequestRepo};

use crate::{AuthError, BalanceChecker, CardValidator, FundsCheck};

const CHALLENGE_EXPIRY_MINUTES: i64 = 15;
const DECISION_EXPIRY_DAYS: i64 = 7;

/// Single entry point for authorization processing.
///
/// Concurrency: calls for one request id are linearized on a per-request
/// lock; the span from limit evaluation to the counter commit holds a
/// per-card lock so racing approvals can never jointly cross a window
/// limit.
pub struct Authorizer {
    pool: SqlitePool,
    validator: CardValidator,
    limits: LimitEvaluator,
    risk: RiskEngine,
    balance: BalanceChecker,
    holds: Arc<HoldManager>,
    clock: Arc<dyn Clock>,
    request_locks: KeyedLocks<i64>,
    card_locks: KeyedLocks<i64>,
    deadline: Duration,
}

impl Authorizer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: SqlitePool,
        validator: CardValidator,
        limits: LimitEvaluator,
        risk: RiskEngine,
        balance: BalanceChecker,
        holds: Arc<HoldManager>,
        clock: Arc<dyn Clock>,
        deadline: std::time::Duration,
    ) -> Self {
        Self {
            pool,
            validator,
            limits,
            risk,
            balance,
            holds,
            clock,
            request_locks: KeyedLocks::new(),
            card_locks: KeyedLocks::new(),
            deadline: Duration::from_std(deadline).unwrap_or_else(|_| Duration::seconds(10)),
        }
    }

    pub fn holds(&self) -> &Arc<HoldManager> {
        &self.holds
    }

    /// Process an authorization attempt into a binding decision.
    ///
    /// With an idempotency key, the request id is derived from the key
    /// and a decision already recorded for it is returned unchanged, with
    /// no side effects.
    pub async fn authorize(
        &self,
        mut request: AuthorizationRequest,
        idempotency_key: Option<&str>,
    ) -> Result<AuthorizationDecision, AuthError> {
        if let Some(key) = idempotency_key {
            if let Some(existing) =
                DecisionRepo::find_by_idempotency_key(&self.pool, key).await?
            {
                tracing::info!(key, decision_id = existing.decision_id, "idempotent replay");
                return Ok(existing);
            }
            request.request_id = ids::request_id_for_key(key);
        }
        if request.request_id <= 0 {
            request.request_id = ids::generate_id();
        }

        let _request_guard = self.request_locks.lock(request.request_id).await;

        // Duplicate submission (or we lost the key race above): the
        // committed decision wins.
        if let Some(existing) =
            DecisionRepo::find_by_request_id(&self.pool, request.request_id).await?
        {
            tracing::info!(
                request_id = request.request_id,
                decision_id = existing.decision_id,
                "duplicate request, returning existing decision"
            );
            return Ok(existing);
        }

        tracing::info!(request_id = request.request_id, "processing authorization");
        let started = self.clock.now();

        // Persist the intake once. An existing row without a decision is
        // the crash-recovery path; processing continues.
        RequestRepo::insert_if_absent(&self.pool, &request).await?;

        let mut path = vec![format!("Request received: {}", request.request_id)];

        if let Err(message) = validate_input(&request) {
            path.push(format!("Request validation failed: {message}"));
            return self
                .persist_decline(
                    &request,
                    idempotency_key,
                    ReasonCode::FormatError,
                    &message,
                    None,
                    None,
                    None,
                    path,
                )
                .await;
        }

        // Step 1: card validation.
        let card = match self.validator.validate(&request).await {
            Ok(card) => card,
            Err(AuthError::BusinessDecline { reason, message }) => {
                path.push(format!("Card validation failed: {message}"));
                return self
                    .persist_decline(
                        &request,
                        idempotency_key,
                        reason,
                        &message,
                        None,
                        None,
                        None,
                        path,
                    )
                    .await;
            }
            Err(AuthError::Validation(message)) => {
                path.push(format!("Card validation failed: {message}"));
                return self
                    .persist_decline(
                        &request,
                        idempotency_key,
                        ReasonCode::FormatError,
                        &message,
                        None,
                        None,
                        None,
                        path,
                    )
                    .await;
            }
            Err(e) => return Err(e),
        };
        path.push("Card validation successful".to_string());
        self.check_deadline(started)?;

        // Limit math through counter commit is serialized per card.
        let _card_guard = self.card_locks.lock(card.card_id).await;

        // Step 2: limits.
        let limits_snapshot = match self.limits.evaluate(&request, &card).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_breach() => {
                let reason = limit_reason(&e);
                let message = e.to_string();
                path.push(format!("Limit validation failed: {message}"));
                return self
                    .persist_decline(
                        &request,
                        idempotency_key,
                        reason,
                        &message,
                        None,
                        None,
                        None,
                        path,
                    )
                    .await;
            }
            Err(e) => return Err(AuthError::Internal(e.to_string())),
        };
        path.push("Limit validation successful".to_string());

        // Step 3: risk.
        let assessment = self.risk.assess(&request, &card);
        path.push(format!(
            "Risk assessment completed: score={}",
            assessment.score
        ));

        match assessment.recommendation {
            Recommendation::Decline => {
                path.push("Transaction declined due to high risk".to_string());
                return self
                    .persist_decline(
                        &request,
                        idempotency_key,
                        ReasonCode::SuspectedFraud,
                        "High risk transaction",
                        Some(assessment.score),
                        Some(limits_snapshot),
                        None,
                        path,
                    )
                    .await;
            }
            Recommendation::Challenge => {
                path.push("Transaction requires additional verification".to_string());
                return self
                    .persist_challenge(
                        &request,
                        idempotency_key,
                        assessment.score,
                        limits_snapshot,
                        path,
                    )
                    .await;
            }
            Recommendation::Approve => {}
        }
        self.check_deadline(started)?;

        // Step 4: balance.
        let funds = match self.balance.check(&request, &card).await {
            Ok(funds) => funds,
            Err(AuthError::BusinessDecline { reason, message }) => {
                path.push(format!("Insufficient funds: {message}"));
                return self
                    .persist_decline(
                        &request,
                        idempotency_key,
                        reason,
                        &message,
                        Some(assessment.score),
                        Some(limits_snapshot),
                        None,
                        path,
                    )
                    .await;
            }
            Err(e) => return Err(e),
        };
        path.push("Sufficient funds available".to_string());
        self.check_deadline(started)?;

        // Step 5: hold creation (ledger reserve happens inside).
        let decision_id = ids::generate_id();
        let authorization_code = ids::generate_authorization_code();
        let (hold, reserve_snapshot) = match self
            .holds
            .create(create_hold_params(
                &request,
                &card,
                &funds,
                decision_id,
                authorization_code.clone(),
            ))
            .await
        {
            Ok(pair) => pair,
            Err(e) if e.is_insufficient_funds() => {
                let message = e.to_string();
                path.push(format!("Insufficient funds: {message}"));
                return self
                    .persist_decline(
                        &request,
                        idempotency_key,
                        ReasonCode::InsufficientFunds,
                        &message,
                        Some(assessment.score),
                        Some(limits_snapshot),
                        None,
                        path,
                    )
                    .await;
            }
            Err(HoldError::Ledger(e)) if cardgate_core::Transient::is_transient(&e) => {
                return Err(AuthError::TransientUpstream(e.to_string()));
            }
            Err(e) => return Err(AuthError::Internal(e.to_string())),
        };
        path.push(format!("Authorization hold created: {}", hold.hold_id));

        // Step 6: form and commit the decision, counters included.
        let now = self.clock.now();
        let balance_snapshot = attach_fx(reserve_snapshot, &funds);
        let decision = AuthorizationDecision {
            decision_id,
            request_id: request.request_id,
            idempotency_key: idempotency_key.map(String::from),
            decision: DecisionType::Approved,
            reason_code: ReasonCode::ApprovedTransaction,
            reason_message: "Transaction approved".to_string(),
            approved_amount: request.amount,
            currency: request.currency.clone(),
            authorization_code: Some(authorization_code),
            risk_score: Some(assessment.score),
            hold_id: Some(hold.hold_id),
            limits_snapshot: Some(limits_snapshot),
            balance_snapshot: Some(balance_snapshot),
            decision_path: path,
            timestamp: now,
            expires_at: Some(now + Duration::days(DECISION_EXPIRY_DAYS)),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.commit_approval(&decision, &request, &card).await {
            tracing::error!(
                request_id = request.request_id,
                hold_id = hold.hold_id,
                error = %e,
                "decision commit failed, compensating hold"
            );
            let compensation_key = format!("authorize-compensation-{}", request.request_id);
            if let Err(release_error) = self
                .holds
                .release(hold.hold_id, Some(&compensation_key))
                .await
            {
                tracing::error!(
                    hold_id = hold.hold_id,
                    error = %release_error,
                    "compensating release failed"
                );
            }
            return Err(e);
        }

        tracing::info!(
            request_id = request.request_id,
            decision_id = decision.decision_id,
            amount = %decision.approved_amount,
            "authorization approved"
        );
        Ok(decision)
    }

    /// Look up a decision by its id.
    pub async fn decision_by_id(
        &self,
        decision_id: i64,
    ) -> Result<AuthorizationDecision, AuthError> {
        DecisionRepo::find_by_decision_id(&self.pool, decision_id)
            .await?
            .ok_or_else(|| AuthError::not_found("AuthorizationDecision", decision_id))
    }

    /// Look up the decision for a request.
    pub async fn decision_by_request_id(
        &self,
        request_id: i64,
    ) -> Result<AuthorizationDecision, AuthError> {
        DecisionRepo::find_by_request_id(&self.pool, request_id)
            .await?
            .ok_or_else(|| AuthError::not_found("AuthorizationDecision", request_id))
    }

    /// Reverse an approved authorization: the decision becomes DECLINED,
    /// the hold is released and the spending counters are restored.
    pub async fn reverse(
        &self,
        request_id: i64,
        reason: &str,
    ) -> Result<AuthorizationDecision, AuthError> {
        let _request_guard = self.request_locks.lock(request_id).await;

        let mut decision = self.decision_by_request_id(request_id).await?;
        if !decision.decision.is_approval() {
            return Err(AuthError::InvalidState(
                "Only approved authorizations can be reversed".into(),
            ));
        }

        let request = RequestRepo::find_by_request_id(&self.pool, request_id).await?;
        tracing::info!(request_id, reason, "reversing authorization");

        // Release the reserved funds. Already-expired holds are fine (the
        // funds went back at expiry); captured holds cannot be reversed.
        let mut card_id = None;
        if let Some(hold_id) = decision.hold_id {
            let operation_key = format!("reverse-{request_id}");
            match self.holds.release(hold_id, Some(&operation_key)).await {
                Ok(hold) => card_id = Some(hold.card_id),
                Err(HoldError::InvalidState { current, .. }) => {
                    return Err(AuthError::InvalidState(format!(
                        "hold {hold_id} is {current}, cannot reverse"
                    )));
                }
                Err(HoldError::NotFound { .. }) => {
                    tracing::warn!(hold_id, "hold missing during reversal");
                }
                Err(e) => return Err(AuthError::Internal(e.to_string())),
            }
        }

        let now = self.clock.now();
        decision.decision = DecisionType::Declined;
        decision.reason_code = ReasonCode::DuplicateTransaction;
        decision.reason_message = format!("Authorization reversed: {reason}");
        decision.approved_amount = Amount::ZERO;
        decision
            .decision_path
            .push(format!("Authorization reversed: {reason}"));
        if let Some(hold_id) = decision.hold_id.take() {
            decision
                .decision_path
                .push(format!("Hold released: {hold_id}"));
        }
        decision.updated_at = now;

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        DecisionRepo::update(&mut tx, &decision).await?;
        if let Some(card_id) = card_id {
            self.limits
                .reverse_spend(&mut tx, card_id, request_id, request.amount)
                .await
                .map_err(|e| AuthError::Internal(e.to_string()))?;
        }
        tx.commit().await.map_err(map_sqlx)?;

        Ok(decision)
    }

    /// Complete a pending 3-DS challenge.
    ///
    /// `"SUCCESS"` resumes the pipeline at the balance step and flips the
    /// decision to APPROVED; anything else declines with
    /// `SECURITY_VIOLATION`. Completion after the challenge expiry fails.
    pub async fn complete_challenge(
        &self,
        request_id: i64,
        challenge_result: &str,
    ) -> Result<AuthorizationDecision, AuthError> {
        let _request_guard = self.request_locks.lock(request_id).await;

        let mut decision = self.decision_by_request_id(request_id).await?;
        if decision.decision != DecisionType::Challenge {
            return Err(AuthError::InvalidState(
                "Decision is not in challenge state".into(),
            ));
        }
        let now = self.clock.now();
        if let Some(expires_at) = decision.expires_at {
            if now > expires_at {
                return Err(AuthError::InvalidState("Challenge has expired".into()));
            }
        }

        let request = RequestRepo::find_by_request_id(&self.pool, request_id).await?;

        if challenge_result != "SUCCESS" {
            tracing::info!(request_id, challenge_result, "challenge failed");
            decision.decision = DecisionType::Declined;
            decision.reason_code = ReasonCode::SecurityViolation;
            decision.reason_message = format!("Challenge failed: {challenge_result}");
            decision.approved_amount = Amount::ZERO;
            decision
                .decision_path
                .push(format!("Challenge failed: {challenge_result}"));
            decision.updated_at = now;

            let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
            DecisionRepo::update(&mut tx, &decision).await?;
            RequestRepo::mark_processed(&mut tx, request_id, now).await?;
            tx.commit().await.map_err(map_sqlx)?;
            return Ok(decision);
        }

        // Resume the pipeline from the balance step.
        let card = self.validator.validate(&request).await?;
        let _card_guard = self.card_locks.lock(card.card_id).await;

        let funds = match self.balance.check(&request, &card).await {
            Ok(funds) => funds,
            Err(AuthError::BusinessDecline { reason, message }) => {
                decision.decision = DecisionType::Declined;
                decision.reason_code = reason;
                decision.reason_message = message.clone();
                decision.approved_amount = Amount::ZERO;
                decision
                    .decision_path
                    .push(format!("Insufficient funds: {message}"));
                decision.updated_at = now;

                let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
                DecisionRepo::update(&mut tx, &decision).await?;
                RequestRepo::mark_processed(&mut tx, request_id, now).await?;
                tx.commit().await.map_err(map_sqlx)?;
                return Ok(decision);
            }
            Err(e) => return Err(e),
        };

        let authorization_code = ids::generate_authorization_code();
        let (hold, reserve_snapshot) = self
            .holds
            .create(create_hold_params(
                &request,
                &card,
                &funds,
                decision.decision_id,
                authorization_code.clone(),
            ))
            .await
            .map_err(|e| {
                if e.is_insufficient_funds() {
                    AuthError::decline(ReasonCode::InsufficientFunds, e.to_string())
                } else {
                    AuthError::Internal(e.to_string())
                }
            })?;

        decision.decision = DecisionType::Approved;
        decision.reason_code = ReasonCode::ApprovedTransaction;
        decision.reason_message = "Challenge completed successfully".to_string();
        decision.approved_amount = request.amount;
        decision.authorization_code = Some(authorization_code);
        decision.hold_id = Some(hold.hold_id);
        decision.balance_snapshot = Some(attach_fx(reserve_snapshot, &funds));
        decision
            .decision_path
            .push("Challenge completed successfully".to_string());
        decision
            .decision_path
            .push(format!("Authorization hold created: {}", hold.hold_id));
        decision.expires_at = Some(now + Duration::days(DECISION_EXPIRY_DAYS));
        decision.updated_at = now;

        let commit = async {
            let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
            DecisionRepo::update(&mut tx, &decision).await?;
            RequestRepo::mark_processed(&mut tx, request_id, now).await?;
            self.limits
                .commit_spend(&mut tx, &card, request_id, request.amount)
                .await
                .map_err(|e| AuthError::Internal(e.to_string()))?;
            tx.commit().await.map_err(map_sqlx)?;
            Ok::<(), AuthError>(())
        };
        if let Err(e) = commit.await {
            tracing::error!(
                request_id,
                hold_id = hold.hold_id,
                error = %e,
                "challenge completion commit failed, compensating hold"
            );
            let compensation_key = format!("challenge-compensation-{request_id}");
            if let Err(release_error) = self
                .holds
                .release(hold.hold_id, Some(&compensation_key))
                .await
            {
                tracing::error!(
                    hold_id = hold.hold_id,
                    error = %release_error,
                    "compensating release failed"
                );
            }
            return Err(e);
        }

        tracing::info!(
            request_id,
            decision_id = decision.decision_id,
            "challenge completed, authorization approved"
        );
        Ok(decision)
    }

    async fn commit_approval(
        &self,
        decision: &AuthorizationDecision,
        request: &AuthorizationRequest,
        card: &CardDetails,
    ) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        DecisionRepo::insert(&mut tx, decision).await?;
        RequestRepo::mark_processed(&mut tx, request.request_id, decision.timestamp).await?;
        self.limits
            .commit_spend(&mut tx, card, request.request_id, request.amount)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_decline(
        &self,
        request: &AuthorizationRequest,
        idempotency_key: Option<&str>,
        reason: ReasonCode,
        message: &str,
        risk_score: Option<i32>,
        limits_snapshot: Option<LimitSnapshot>,
        balance_snapshot: Option<BalanceSnapshot>,
        decision_path: Vec<String>,
    ) -> Result<AuthorizationDecision, AuthError> {
        let now = self.clock.now();
        let decision = AuthorizationDecision {
            decision_id: ids::generate_id(),
            request_id: request.request_id,
            idempotency_key: idempotency_key.map(String::from),
            decision: DecisionType::Declined,
            reason_code: reason,
            reason_message: message.to_string(),
            approved_amount: Amount::ZERO,
            currency: request.currency.clone(),
            authorization_code: None,
            risk_score,
            hold_id: None,
            limits_snapshot,
            balance_snapshot,
            decision_path,
            timestamp: now,
            expires_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        DecisionRepo::insert(&mut tx, &decision).await?;
        RequestRepo::mark_processed(&mut tx, request.request_id, now).await?;
        tx.commit().await.map_err(map_sqlx)?;

        tracing::info!(
            request_id = request.request_id,
            reason = reason.as_str(),
            "authorization declined"
        );
        Ok(decision)
    }

    async fn persist_challenge(
        &self,
        request: &AuthorizationRequest,
        idempotency_key: Option<&str>,
        risk_score: i32,
        limits_snapshot: LimitSnapshot,
        decision_path: Vec<String>,
    ) -> Result<AuthorizationDecision, AuthError> {
        let now = self.clock.now();
        let decision = AuthorizationDecision {
            decision_id: ids::generate_id(),
            request_id: request.request_id,
            idempotency_key: idempotency_key.map(String::from),
            decision: DecisionType::Challenge,
            reason_code: ReasonCode::AdditionalAuthenticationRequired,
            reason_message: "Additional verification required".to_string(),
            approved_amount: request.amount,
            currency: request.currency.clone(),
            authorization_code: None,
            risk_score: Some(risk_score),
            hold_id: None,
            limits_snapshot: Some(limits_snapshot),
            balance_snapshot: None,
            decision_path,
            timestamp: now,
            expires_at: Some(now + Duration::minutes(CHALLENGE_EXPIRY_MINUTES)),
            created_at: now,
            updated_at: now,
        };

        // CHALLENGE is not terminal: the request stays unprocessed until
        // completion resolves it.
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        DecisionRepo::insert(&mut tx, &decision).await?;
        tx.commit().await.map_err(map_sqlx)?;

        tracing::info!(
            request_id = request.request_id,
            risk_score,
            "authorization challenged"
        );
        Ok(decision)
    }

    fn check_deadline(&self, started: DateTime<Utc>) -> Result<(), AuthError> {
        if self.clock.now() - started > self.deadline {
            return Err(AuthError::Internal(
                "authorization deadline exceeded".into(),
            ));
        }
        Ok(())
    }
}

fn validate_input(request: &AuthorizationRequest) -> Result<(), String> {
    if !request.has_card_reference() {
        return Err("Neither PAN hash nor token provided".into());
    }
    if request.transaction_type.is_value_bearing() && request.amount.is_zero() {
        return Err(format!(
            "Amount must be positive for {}",
            request.transaction_type
        ));
    }
    Ok(())
}

fn create_hold_params(
    request: &AuthorizationRequest,
    card: &CardDetails,
    funds: &FundsCheck,
    decision_id: i64,
    authorization_code: String,
) -> CreateHold {
    let (exchange_rate, original_amount, original_currency) = match &funds.fx {
        Some((rate, amount, currency)) => (Some(*rate), Some(*amount), Some(currency.clone())),
        None => (None, None, None),
    };
    CreateHold {
        request_id: request.request_id,
        decision_id,
        account_id: card.account_id,
        account_space_id: card.account_space_id,
        card_id: card.card_id,
        merchant_id: request.merchant_id.clone(),
        merchant_name: request.merchant_name.clone(),
        amount: funds.reserve_amount,
        currency: funds.reserve_currency.clone(),
        original_amount,
        original_currency,
        exchange_rate,
        authorization_code,
    }
}

fn attach_fx(snapshot: BalanceSnapshot, funds: &FundsCheck) -> BalanceSnapshot {
    match &funds.fx {
        Some((rate, amount, currency)) => {
            snapshot.with_conversion(*rate, *amount, currency.clone())
        }
        None => snapshot,
    }
}

fn limit_reason(e: &LimitError) -> ReasonCode {
    match e {
        LimitError::ExceedsDailyLimit => ReasonCode::ExceedsDailyLimit,
        LimitError::ExceedsMonthlyLimit => ReasonCode::ExceedsMonthlyLimit,
        _ => ReasonCode::ExceedsTransactionLimit,
    }
}

fn map_sqlx(e: sqlx::Error) -> AuthError {
    AuthError::Internal(e.to_string())
}
