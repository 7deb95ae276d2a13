//! Cardgate Hold Manager
//!
//! The money state machine behind approvals: create reserves funds at the
//! ledger and writes the ACTIVE hold row; capture, release and the expiry
//! sweep drive the one-way transitions out of ACTIVE, each paired with its
//! ledger movement. Every operation on a hold is serialized per hold id.

mod error;
mod manager;

pub use error::HoldError;
pub use manager::{CreateHold, HoldManager, SweepOutcome};
