//! Cardgate CLI - operational surface for the authorization engine

pub mod commands;
pub mod context;

pub use context::AppContext;
