//! Domain models for the farm cooperative platform

mod catalog;
mod order;
mod party;
mod pricing;
mod report;
mod stock;
mod trade;
mod workflow;

pub use catalog::*;
pub use order::*;
pub use party::*;
pub use pricing::*;
pub use report::*;
pub use stock::*;
pub use trade::*;
pub use workflow::*;

/// A stored or submitted code that matches no variant of a closed enumeration
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
