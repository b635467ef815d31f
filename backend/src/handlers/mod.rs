//! HTTP handlers

pub mod cost;
pub mod delivery;
pub mod health;
pub mod order;
pub mod party;
pub mod pricing;
pub mod reporting;
pub mod sale;
pub mod stock;

pub use cost::*;
pub use delivery::*;
pub use health::*;
pub use order::*;
pub use party::*;
pub use pricing::*;
pub use reporting::*;
pub use sale::*;
pub use stock::*;
