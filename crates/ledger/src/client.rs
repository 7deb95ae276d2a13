//! Ledger contract

use async_trait::async_trait;
use cardgate_core::{Amount, BalanceSnapshot, Currency};

use crate::LedgerError;

/// The ledger operations the authorization core relies on.
///
/// Every mutation returns the post-operation `BalanceSnapshot` for the
/// affected (account, space). For every ACTIVE hold, the reserved bucket
/// for its (account, space, currency) must cover at least the hold amount;
/// that invariant is maintained by calling `reserve` before a hold row is
/// written and `release`/`post_capture` when it leaves ACTIVE.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balances for an account (or one of its spaces).
    async fn balance(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
    ) -> Result<BalanceSnapshot, LedgerError>;

    /// Move `amount` from available into the reserved bucket.
    ///
    /// Fails with `InsufficientFunds` when the available balance does not
    /// cover the amount; nothing moves in that case.
    async fn reserve(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        amount: Amount,
        currency: &Currency,
    ) -> Result<BalanceSnapshot, LedgerError>;

    /// Return `amount` from the reserved bucket to available.
    async fn release(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        amount: Amount,
        currency: &Currency,
    ) -> Result<BalanceSnapshot, LedgerError>;

    /// Post a captured amount out of the reserved bucket to the merchant
    /// ledger. `reference` identifies the capture for reconciliation.
    async fn post_capture(
        &self,
        account_id: i64,
        account_space_id: Option<i64>,
        amount: Amount,
        currency: &Currency,
        reference: &str,
    ) -> Result<BalanceSnapshot, LedgerError>;
}
