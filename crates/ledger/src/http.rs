//! HTTP client for a remote ledger

use std::time::Duration;

use async_trait::async_trait;
use cardgate_core::{Amount, BalanceSnapshot, Currency};
use reqwest::StatusCode;
use serde::Serialize;

use crate::{Ledger, LedgerError};

/// Ledger over HTTP.
///
/// Endpoints (all responses are `BalanceSnapshot` JSON):
/// - `GET  {base}/accounts/{id}/balance[?space={space}]`
/// - `POST {base}/accounts/{id}/reserve`       body `{amount, currency, account_space_id}`
/// - `POST {base}/accounts/{id}/release`       body as above
/// - `POST {base}/accounts/{id}/capture`       body plus `reference`
///
/// 404 maps to `UnknownAccount`, 422 to `InsufficientFunds`; connection
/// failures, timeouts and 5xx map to `Transport` (retriable by callers).
pub struct HttpLedger {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct MovementBody<'a> {
    amount: Amount,
    currency: &'a str,
    account_space_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<&'a str>,
}

impl HttpLedger {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(LedgerError::Configuration(
                "ledger base_url must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn decode(
        response: reqwest::Response,
        account_id: i64,
    ) -> Result<BalanceSnapshot, LedgerError> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(LedgerError::UnknownAccount { account_id }),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let detail = response.text().await.unwrap_or_default();
                Err(LedgerError::InsufficientFunds {
                    requested: detail,
                    available: String::new(),
                })
            }
            status if status.is_success() => response
                .json::<BalanceSnapshot>()
                .await
                .map_err(|e| LedgerError::Transport(e.to_string())),
            status => Err(LedgerError::Transport(format!(
                "ledger returned {status}"
            ))),
        }
    }

    async fn movement(
        &self,
        account_id: i64,
        action: &str,
        body: MovementBody<'_>,
    ) -> Result<BalanceSnapshot, LedgerError> {
        let url = format!("{}/accounts/{}/{}", self.base_url, account_id, action);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Self::decode(response, account_id).await
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn balance(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
    ) -> Result<BalanceSnapshot, LedgerError> {
        let mut url = format!("{}/accounts/{}/balance", self.base_url, account_id);
        if let Some(space) = account_space_id {
            url.push_str(&format!("?space={space}"));
        }
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Self::decode(response, account_id).await
    }

    async fn reserve(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        amount: Amount,
        currency: &Currency,
    ) -> Result<BalanceSnapshot, LedgerError> {
        self.movement(
            account_id,
            "reserve",
            MovementBody {
                amount,
                currency: currency.code(),
                account_space_id,
                reference: None,
            },
        )
        .await
    }

    async fn release(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        amount: Amount,
        currency: &Currency,
    ) -> Result<BalanceSnapshot, LedgerError> {
        self.movement(
            account_id,
            "release",
            MovementBody {
                amount,
                currency: currency.code(),
                account_space_id,
                reference: None,
            },
        )
        .await
    }

    async fn post_capture(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        amount: Amount,
        currency: &Currency,
        reference: &str,
    ) -> Result<BalanceSnapshot, LedgerError> {
        self.movement(
            account_id,
            "capture",
            MovementBody {
                amount,
                currency: currency.code(),
                account_space_id,
                reference: Some(reference),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_base_url_rejected() {
        let result = HttpLedger::new("", Duration::from_secs(5));
        assert!(matches!(result, Err(LedgerError::Configuration(_))));
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let ledger = HttpLedger::new("http://ledger.local/", Duration::from_secs(5)).unwrap();
        assert_eq!(ledger.base_url, "http://ledger.local");
    }
}
