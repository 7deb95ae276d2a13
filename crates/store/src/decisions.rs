//! Repository for authorization decisions

use cardgate_core::AuthorizationDecision;
use sqlx::{SqliteConnection, SqlitePool};

use crate::schema::DecisionRow;
use crate::StoreResult;

/// Repository for the `authorization_decisions` table.
///
/// One decision per request id (unique index); decisions carrying an
/// idempotency key are additionally unique per key.
pub struct DecisionRepo;

impl DecisionRepo {
    /// Insert a new decision. Runs inside the decision transaction.
    pub async fn insert(
        conn: &mut SqliteConnection,
        decision: &AuthorizationDecision,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO authorization_decisions (
                decision_id, request_id, idempotency_key, decision, reason_code,
                reason_message, approved_amount, currency, authorization_code,
                risk_score, hold_id, limits_snapshot, balance_snapshot,
                decision_path, timestamp, expires_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(decision.decision_id)
        .bind(decision.request_id)
        .bind(&decision.idempotency_key)
        .bind(decision.decision.as_str())
        .bind(decision.reason_code.as_str())
        .bind(&decision.reason_message)
        .bind(decision.approved_amount.to_string())
        .bind(decision.currency.code())
        .bind(&decision.authorization_code)
        .bind(decision.risk_score)
        .bind(decision.hold_id)
        .bind(
            decision
                .limits_snapshot
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(
            decision
                .balance_snapshot
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(serde_json::to_string(&decision.decision_path)?)
        .bind(decision.timestamp)
        .bind(decision.expires_at)
        .bind(decision.created_at)
        .bind(decision.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Rewrite the mutable portion of a decision (challenge completion and
    /// reversal are the only writers). Runs inside a transaction.
    pub async fn update(
        conn: &mut SqliteConnection,
        decision: &AuthorizationDecision,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE authorization_decisions SET
                decision = ?, reason_code = ?, reason_message = ?,
                approved_amount = ?, authorization_code = ?, hold_id = ?,
                balance_snapshot = ?, decision_path = ?, expires_at = ?,
                updated_at = ?
             WHERE decision_id = ?",
        )
        .bind(decision.decision.as_str())
        .bind(decision.reason_code.as_str())
        .bind(&decision.reason_message)
        .bind(decision.approved_amount.to_string())
        .bind(&decision.authorization_code)
        .bind(decision.hold_id)
        .bind(
            decision
                .balance_snapshot
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(serde_json::to_string(&decision.decision_path)?)
        .bind(decision.expires_at)
        .bind(decision.updated_at)
        .bind(decision.decision_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Fetch a decision by its id.
    pub async fn find_by_decision_id(
        pool: &SqlitePool,
        decision_id: i64,
    ) -> StoreResult<Option<AuthorizationDecision>> {
        let row = sqlx::query_as::<_, DecisionRow>(
            "SELECT * FROM authorization_decisions WHERE decision_id = ?",
        )
        .bind(decision_id)
        .fetch_optional(pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Fetch the decision for a request.
    pub async fn find_by_request_id(
        pool: &SqlitePool,
        request_id: i64,
    ) -> StoreResult<Option<AuthorizationDecision>> {
        let row = sqlx::query_as::<_, DecisionRow>(
            "SELECT * FROM authorization_decisions WHERE request_id = ?",
        )
        .bind(request_id)
        .fetch_optional(pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Fetch the decision recorded for an idempotency key, if any.
    pub async fn find_by_idempotency_key(
        pool: &SqlitePool,
        key: &str,
    ) -> StoreResult<Option<AuthorizationDecision>> {
        let row = sqlx::query_as::<_, DecisionRow>(
            "SELECT * FROM authorization_decisions WHERE idempotency_key = ?",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestRepo, Store};
    use cardgate_core::model::request::{TransactionChannel, TransactionType};
    use cardgate_core::{
        Amount, AuthorizationRequest, Currency, DecisionType, ReasonCode,
    };
    use chrono::Utc;
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
            amount: Amount::new(dec!(50)).unwrap(),
            currency: Currency::Usd,
            timestamp: Utc::now(),
            cryptogram: None,
            pin_data: None,
            three_ds_data: None,
            additional_data: None,
            processed: false,
            processed_at: None,
            created_at: Utc::now(),
        }
    }

    fn sample_decision(decision_id: i64, request_id: i64) -> AuthorizationDecision {
        AuthorizationDecision {
            decision_id,
            request_id,
            idempotency_key: Some(format!("key-{request_id}")),
            decision: DecisionType::Approved,
            reason_code: ReasonCode::ApprovedTransaction,
            reason_message: "Transaction approved".into(),
            approved_amount: Amount::new(dec!(50)).unwrap(),
            currency: Currency::Usd,
            authorization_code: Some("123456".into()),
            risk_score: Some(0),
            hold_id: Some(300_000_000_001),
            limits_snapshot: None,
            balance_snapshot: None,
            decision_path: vec!["Request received".into(), "Card validation successful".into()],
            timestamp: Utc::now(),
            expires_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn seed(store: &Store, request_id: i64, decision_id: i64) -> AuthorizationDecision {
        RequestRepo::insert_if_absent(store.pool(), &sample_request(request_id))
            .await
            .unwrap();
        let decision = sample_decision(decision_id, request_id);
        let mut tx = store.begin().await.unwrap();
        DecisionRepo::insert(&mut tx, &decision).await.unwrap();
        tx.commit().await.unwrap();
        decision
    }

    #[tokio::test]
    async fn test_insert_and_lookups() {
        let store = Store::in_memory().await.unwrap();
        let decision = seed(&store, 100_000_000_010, 200_000_000_010).await;

        let by_id = DecisionRepo::find_by_decision_id(store.pool(), decision.decision_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.request_id, decision.request_id);
        assert_eq!(by_id.decision, DecisionType::Approved);
        assert_eq!(by_id.decision_path.len(), 2);

        let by_request = DecisionRepo::find_by_request_id(store.pool(), decision.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_request.decision_id, decision.decision_id);

        let by_key = DecisionRepo::find_by_idempotency_key(
            store.pool(),
            decision.idempotency_key.as_deref().unwrap(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(by_key.decision_id, decision.decision_id);
    }

    #[tokio::test]
    async fn test_one_decision_per_request() {
        let store = Store::in_memory().await.unwrap();
        seed(&store, 100_000_000_011, 200_000_000_011).await;

        // Second decision for the same request must hit the unique index.
        let mut dup = sample_decision(200_000_000_099, 100_000_000_011);
        dup.idempotency_key = None;
        let mut tx = store.begin().await.unwrap();
        let result = DecisionRepo::insert(&mut tx, &dup).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_rewrites_mutable_fields() {
        let store = Store::in_memory().await.unwrap();
        let mut decision = seed(&store, 100_000_000_012, 200_000_000_012).await;

        decision.decision = DecisionType::Declined;
        decision.reason_code = ReasonCode::DuplicateTransaction;
        decision.reason_message = "Authorization reversed: cancelled".into();
        decision.approved_amount = Amount::ZERO;
        decision.hold_id = None;

        let mut tx = store.begin().await.unwrap();
        DecisionRepo::update(&mut tx, &decision).await.unwrap();
        tx.commit().await.unwrap();

        let found = DecisionRepo::find_by_decision_id(store.pool(), decision.decision_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.decision, DecisionType::Declined);
        assert_eq!(found.reason_code, ReasonCode::DuplicateTransaction);
        assert!(found.hold_id.is_none());
    }

    #[tokio::test]
    async fn test_missing_decision_is_none() {
        let store = Store::in_memory().await.unwrap();
        assert!(DecisionRepo::find_by_decision_id(store.pool(), 1)
            .await
            .unwrap()
            .is_none());
    }
}
