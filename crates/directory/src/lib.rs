//! Cardgate Card Directory
//!
//! Lookup of card attributes by PAN hash or token. The directory is an
//! external collaborator; this crate carries its contract, an HTTP client
//! for a remote directory, and a seedable in-memory implementation for
//! tests and local runs.

mod card;
mod client;
mod error;
mod http;
mod mock;

pub use card::{CardDetails, CardLimits, CardStatus, LimitOverride};
pub use client::CardDirectory;
pub use error::DirectoryError;
pub use http::HttpCardDirectory;
pub use mock::{card_with, MockCardDirectory};
