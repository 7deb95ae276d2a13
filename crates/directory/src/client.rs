//! Card directory contract

use async_trait::async_trait;

use crate::{CardDetails, DirectoryError};

/// Lookup of card attributes by PAN hash or token.
///
/// Implementations:
/// - `HttpCardDirectory`: remote directory over HTTP
/// - `MockCardDirectory`: seedable in-memory directory for tests
#[async_trait]
pub trait CardDirectory: Send + Sync {
    /// Resolve a card by the hash of its PAN.
    async fn find_by_pan_hash(&self, pan_hash: &str) -> Result<CardDetails, DirectoryError>;

    /// Resolve a card by its network token.
    async fn find_by_token(&self, token: &str) -> Result<CardDetails, DirectoryError>;
}
