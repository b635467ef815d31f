//! Business logic services for the farm cooperative platform

pub mod catalog;
pub mod cost;
pub mod delivery;
pub mod order;
pub mod party;
pub mod pricing;
pub mod reporting;
pub mod sale;
pub mod stock;

pub use catalog::CatalogService;
pub use cost::CostService;
pub use delivery::DeliveryService;
pub use order::OrderService;
pub use party::PartyService;
pub use pricing::PricingService;
pub use reporting::ReportingService;
pub use sale::SaleService;
pub use stock::StockLedgerService;
