//! HTTP client for a remote card directory

use std::time::Duration;

use crate::{CardDetails, CardDirectory, DirectoryError};
use async_trait::async_trait;
use reqwest::StatusCode;

/// Card directory over HTTP.
///
/// Endpoints:
/// - `GET {base}/cards/by-pan-hash/{hash}`
/// - `GET {base}/cards/by-token/{token}`
///
/// Responses are `CardDetails` JSON. 404 maps to `NotFound`; connection
/// failures, timeouts and 5xx map to `Transport` (retriable by callers).
pub struct HttpCardDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCardDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(DirectoryError::Configuration(
                "card directory base_url must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch(&self, path: &str) -> Result<CardDetails, DirectoryError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(DirectoryError::NotFound),
            status if status.is_success() => response
                .json::<CardDetails>()
                .await
                .map_err(|e| DirectoryError::Transport(e.to_string())),
            status => Err(DirectoryError::Transport(format!(
                "directory returned {status} for {url}"
            ))),
        }
    }
}

#[async_trait]
impl CardDirectory for HttpCardDirectory {
    async fn find_by_pan_hash(&self, pan_hash: &str) -> Result<CardDetails, DirectoryError> {
        self.fetch(&format!("/cards/by-pan-hash/{pan_hash}")).await
    }

    async fn find_by_token(&self, token: &str) -> Result<CardDetails, DirectoryError> {
        self.fetch(&format!("/cards/by-token/{token}")).await
    }
}
