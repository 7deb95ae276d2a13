//! Cardgate Ledger
//!
//! Contract of the ledger collaborator: balance reads and the three
//! money-moving operations the authorization core relies on - reserve,
//! release, and capture posting. Carries an HTTP client for a remote
//! ledger and an inspectable in-memory implementation used by tests and
//! local runs.

mod client;
mod error;
mod http;
mod memory;

pub use client::Ledger;
pub use error::LedgerError;
pub use http::HttpLedger;
pub use memory::InMemoryLedger;
