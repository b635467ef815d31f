//! Shared types and models for the farm cooperative platform
//!
//! This crate holds the domain rules shared between the backend and the
//! form helpers compiled to WASM: stock ledger checks, order transitions,
//! price resolution and report aggregation.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
