//! Cardgate FX Provider
//!
//! Rate lookup between two currency codes. The authorization flow assumes
//! a rate table is available; sourcing rates is someone else's job.

mod error;
mod rates;

pub use error::FxError;
pub use rates::{convert, FxProvider, RateTable};
