//! Domain entities
//!
//! The persisted shapes of the authorization flow: the as-received request,
//! the binding decision, the funds hold behind an approval, and the
//! period-scoped spending windows consumed by limit checks, together with
//! the snapshot value objects embedded in decisions.

pub mod decision;
pub mod hold;
pub mod request;
pub mod snapshot;
pub mod window;
