//! Customer orders and the packaging runs executed against them

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::UnknownVariant;

/// Order lifecycle: OPEN -> IN_PROGRESS -> DONE
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot move order from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Done => "DONE",
        }
    }

    /// The only status this one may advance to
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Open => Some(OrderStatus::InProgress),
            OrderStatus::InProgress => Some(OrderStatus::Done),
            OrderStatus::Done => None,
        }
    }

    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        self.next() == Some(to)
    }

    pub fn transition_to(&self, to: OrderStatus) -> Result<OrderStatus, TransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError { from: *self, to })
        }
    }

    /// Packaging may still be booked against the order
    pub fn accepts_packaging(&self) -> bool {
        !matches!(self, OrderStatus::Done)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(OrderStatus::Open),
            "IN_PROGRESS" => Ok(OrderStatus::InProgress),
            "DONE" => Ok(OrderStatus::Done),
            other => Err(UnknownVariant::new("order status", other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer order for a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub quantity_colli: i32,
    pub delivery_date: NaiveDate,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A packaging run turning raw station stock into packed colli
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagingRun {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub station_id: Uuid,
    pub plant_id: Uuid,
    pub variety_id: Uuid,
    pub product_id: Uuid,
    pub raw_input_kg: Decimal,
    pub colli_packed: i32,
    pub sorting_waste_kg: Decimal,
    pub packing_cost: Decimal,
    pub run_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Yield figures of a packaging run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackagingYield {
    pub raw_input_kg: Decimal,
    pub packed_weight_kg: Decimal,
    pub sorting_waste_kg: Decimal,
    /// packed / raw * 100, rounded to two places
    pub yield_percent: Decimal,
    /// 100 - yield, never below zero
    pub loss_percent: Decimal,
}

/// Calculate yield and loss of a packaging run.
/// A run without raw input, or one whose ratio is out of range, yields zero
/// and loses nothing.
pub fn calculate_packaging_yield(
    raw_input_kg: Decimal,
    packed_weight_kg: Decimal,
    sorting_waste_kg: Decimal,
) -> PackagingYield {
    let hundred = Decimal::from(100);
    let ratio = if raw_input_kg <= Decimal::ZERO {
        None
    } else {
        packed_weight_kg
            .checked_div(raw_input_kg)
            .and_then(|r| r.checked_mul(hundred))
    };
    let (yield_percent, loss_percent) = match ratio {
        Some(r) => {
            let y = r.round_dp(2);
            (y, hundred.saturating_sub(y).max(Decimal::ZERO))
        }
        None => (Decimal::ZERO, Decimal::ZERO),
    };

    PackagingYield {
        raw_input_kg,
        packed_weight_kg,
        sorting_waste_kg,
        yield_percent,
        loss_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_is_terminal() {
        assert_eq!(OrderStatus::Done.next(), None);
        assert!(!OrderStatus::Done.accepts_packaging());
    }

    #[test]
    fn open_cannot_skip_to_done() {
        let err = OrderStatus::Open.transition_to(OrderStatus::Done).unwrap_err();
        assert_eq!(err.from, OrderStatus::Open);
        assert_eq!(err.to, OrderStatus::Done);
    }
}
