//! Deliveries, direct sales, customer sales, complaints and manual costs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Quality, UnknownVariant};

/// Delivery status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Recorded,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Recorded => "RECORDED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECORDED" => Ok(DeliveryStatus::Recorded),
            "CANCELLED" => Ok(DeliveryStatus::Cancelled),
            other => Err(UnknownVariant::new("delivery status", other)),
        }
    }
}

/// Raw potatoes handed from a farmer to a packing station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub station_id: Uuid,
    pub variety_id: Uuid,
    pub quantity_kg: Decimal,
    pub quality: Quality,
    pub delivery_date: NaiveDate,
    /// Farmer price in force on the delivery date, if one was configured
    pub price_per_kg: Option<Decimal>,
    pub status: DeliveryStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Delivery {
    /// Amount owed to the farmer, zero when cancelled or unpriced
    pub fn payout(&self) -> Decimal {
        match (self.status, self.price_per_kg) {
            (DeliveryStatus::Recorded, Some(price)) => self.quantity_kg * price,
            _ => Decimal::ZERO,
        }
    }
}

/// Potatoes sold by a farmer directly, outside the cooperative
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectSale {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub variety_id: Uuid,
    pub quantity_kg: Decimal,
    pub price_per_kg: Option<Decimal>,
    pub buyer: Option<String>,
    pub sale_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Planned delivery volume of one farmer for one ISO week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPlan {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub variety_id: Uuid,
    pub iso_year: i32,
    pub iso_week: u32,
    pub planned_kg: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Packed product sold to a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub plant_id: Uuid,
    pub product_id: Uuid,
    pub order_id: Option<Uuid>,
    pub quantity_colli: i32,
    pub price_per_colli: Decimal,
    pub revenue: Decimal,
    pub sale_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Kind of customer complaint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintKind {
    /// Goods sent back
    Return,
    /// Customer keeps the goods at a lower price
    PriceReduction,
    /// Quality claim settled without goods or price change
    Quality,
}

impl ComplaintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintKind::Return => "RETURN",
            ComplaintKind::PriceReduction => "PRICE_REDUCTION",
            ComplaintKind::Quality => "QUALITY",
        }
    }
}

impl std::str::FromStr for ComplaintKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RETURN" => Ok(ComplaintKind::Return),
            "PRICE_REDUCTION" => Ok(ComplaintKind::PriceReduction),
            "QUALITY" => Ok(ComplaintKind::Quality),
            other => Err(UnknownVariant::new("complaint kind", other)),
        }
    }
}

/// A complaint raised against a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub kind: ComplaintKind,
    pub affected_colli: i32,
    pub cost: Decimal,
    pub restocked: bool,
    pub reason: Option<String>,
    pub complaint_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Category of a manually entered cost
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostCategory {
    PackagingMaterial,
    Transport,
    Labor,
    Storage,
    Other,
}

impl CostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::PackagingMaterial => "PACKAGING_MATERIAL",
            CostCategory::Transport => "TRANSPORT",
            CostCategory::Labor => "LABOR",
            CostCategory::Storage => "STORAGE",
            CostCategory::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for CostCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PACKAGING_MATERIAL" => Ok(CostCategory::PackagingMaterial),
            "TRANSPORT" => Ok(CostCategory::Transport),
            "LABOR" => Ok(CostCategory::Labor),
            "STORAGE" => Ok(CostCategory::Storage),
            "OTHER" => Ok(CostCategory::Other),
            other => Err(UnknownVariant::new("cost category", other)),
        }
    }
}

/// A cost booked by hand (transport, labour, material, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualCost {
    pub id: Uuid,
    pub category: CostCategory,
    pub amount: Decimal,
    pub cost_date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
