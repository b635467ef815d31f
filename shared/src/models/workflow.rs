//! Rules the trading workflows check before they touch the ledgers

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::{ComplaintKind, DeliveryStatus, OrderStatus};

/// A workflow request that breaks a business rule
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("delivery is already cancelled")]
    AlreadyCancelled,

    #[error("cannot package against order in status {0}")]
    OrderClosed(OrderStatus),

    #[error("product does not match the order")]
    ProductMismatch,

    #[error("product is packed from a different variety")]
    VarietyMismatch,

    #[error("order belongs to a different customer or product")]
    OrderMismatch,

    #[error("no price configured for this customer and product on {0}")]
    NoPrice(NaiveDate),

    #[error("only returned goods can be restocked")]
    RestockRequiresReturn,

    #[error("{affected} affected colli exceed the {sold} colli sold")]
    AffectedExceedsSold { affected: i32, sold: i32 },

    #[error("amount of {quantity} x {rate} is out of range")]
    AmountOutOfRange { quantity: i32, rate: Decimal },
}

impl WorkflowError {
    /// Input field the error points at; `None` for state errors
    pub fn field(&self) -> Option<&'static str> {
        match self {
            WorkflowError::AlreadyCancelled | WorkflowError::OrderClosed(_) => None,
            WorkflowError::ProductMismatch => Some("product_id"),
            WorkflowError::VarietyMismatch => Some("variety_id"),
            WorkflowError::OrderMismatch => Some("order_id"),
            WorkflowError::NoPrice(_) => Some("price_per_colli"),
            WorkflowError::RestockRequiresReturn => Some("restocked"),
            WorkflowError::AffectedExceedsSold { .. } => Some("affected_colli"),
            WorkflowError::AmountOutOfRange { .. } => Some("quantity_colli"),
        }
    }
}

/// A delivery can be cancelled once
pub fn check_cancellable(status: DeliveryStatus) -> Result<(), WorkflowError> {
    match status {
        DeliveryStatus::Recorded => Ok(()),
        DeliveryStatus::Cancelled => Err(WorkflowError::AlreadyCancelled),
    }
}

/// A product bound to a variety is only packed from that variety
pub fn check_run_variety(product_variety: Option<Uuid>, run_variety: Uuid) -> Result<(), WorkflowError> {
    match product_variety {
        Some(variety) if variety != run_variety => Err(WorkflowError::VarietyMismatch),
        _ => Ok(()),
    }
}

/// Status an order moves to when a run is packed against it,
/// `None` when it keeps its status
pub fn order_status_after_packaging(
    order_status: OrderStatus,
    order_product: Uuid,
    run_product: Uuid,
) -> Result<Option<OrderStatus>, WorkflowError> {
    if !order_status.accepts_packaging() {
        return Err(WorkflowError::OrderClosed(order_status));
    }
    if order_product != run_product {
        return Err(WorkflowError::ProductMismatch);
    }
    Ok(match order_status {
        OrderStatus::Open => Some(OrderStatus::InProgress),
        _ => None,
    })
}

/// A sale booked against an order sells that order's product to its customer
pub fn check_sale_order(
    order: (Uuid, Uuid),
    sale_customer: Uuid,
    sale_product: Uuid,
) -> Result<(), WorkflowError> {
    if order != (sale_customer, sale_product) {
        return Err(WorkflowError::OrderMismatch);
    }
    Ok(())
}

/// An explicit price wins over the configured one; a sale needs one of them
pub fn sale_price(
    explicit: Option<Decimal>,
    configured: Option<Decimal>,
    sale_date: NaiveDate,
) -> Result<Decimal, WorkflowError> {
    explicit.or(configured).ok_or(WorkflowError::NoPrice(sale_date))
}

/// `quantity x rate` for revenue and packing cost
pub fn line_amount(quantity: i32, rate: Decimal) -> Result<Decimal, WorkflowError> {
    Decimal::from(quantity)
        .checked_mul(rate)
        .ok_or(WorkflowError::AmountOutOfRange { quantity, rate })
}

/// Colli a complaint books back into plant stock; zero when nothing returns
pub fn complaint_restock(
    kind: ComplaintKind,
    restocked: bool,
    affected_colli: i32,
    sold_colli: i32,
) -> Result<i32, WorkflowError> {
    if restocked && kind != ComplaintKind::Return {
        return Err(WorkflowError::RestockRequiresReturn);
    }
    if affected_colli > sold_colli {
        return Err(WorkflowError::AffectedExceedsSold {
            affected: affected_colli,
            sold: sold_colli,
        });
    }
    Ok(if restocked { affected_colli } else { 0 })
}
