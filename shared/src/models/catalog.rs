//! Potato varieties and packaged products

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// Cooking type of a potato variety, the primary grouping axis for planning and reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CookingType {
    Waxy,
    MostlyWaxy,
    Floury,
}

impl CookingType {
    pub const ALL: [CookingType; 3] = [
        CookingType::Waxy,
        CookingType::MostlyWaxy,
        CookingType::Floury,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CookingType::Waxy => "WAXY",
            CookingType::MostlyWaxy => "MOSTLY_WAXY",
            CookingType::Floury => "FLOURY",
        }
    }
}

impl std::str::FromStr for CookingType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAXY" => Ok(CookingType::Waxy),
            "MOSTLY_WAXY" => Ok(CookingType::MostlyWaxy),
            "FLOURY" => Ok(CookingType::Floury),
            other => Err(UnknownVariant::new("cooking type", other)),
        }
    }
}

impl std::fmt::Display for CookingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CookingType::Waxy => write!(f, "Waxy"),
            CookingType::MostlyWaxy => write!(f, "Mostly waxy"),
            CookingType::Floury => write!(f, "Floury"),
        }
    }
}

/// A potato variety grown by member farms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variety {
    pub id: Uuid,
    pub name: String,
    pub cooking_type: CookingType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A packaged product sold to customers.
///
/// One colli holds `units_per_colli` sale units of `unit_weight_kg` each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub variety_id: Option<Uuid>,
    pub cooking_type: CookingType,
    pub unit_weight_kg: Decimal,
    pub units_per_colli: i32,
    pub packing_cost_per_colli: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Net weight of one colli in kilograms
    pub fn colli_weight_kg(&self) -> Decimal {
        colli_weight_kg(self.unit_weight_kg, self.units_per_colli)
    }
}

/// Net weight of one colli in kilograms, saturating at the decimal range
pub fn colli_weight_kg(unit_weight_kg: Decimal, units_per_colli: i32) -> Decimal {
    unit_weight_kg.saturating_mul(Decimal::from(units_per_colli))
}

/// Net weight of `colli` cases in kilograms, saturating at the decimal range
pub fn packed_weight_kg(colli: Decimal, unit_weight_kg: Decimal, units_per_colli: i32) -> Decimal {
    colli.saturating_mul(colli_weight_kg(unit_weight_kg, units_per_colli))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cooking_type_round_trips_through_str() {
        for ct in CookingType::ALL {
            assert_eq!(CookingType::from_str(ct.as_str()).unwrap(), ct);
        }
        assert!(CookingType::from_str("waxy").is_err());
    }

    #[test]
    fn packed_weight_uses_units_per_colli() {
        // 10 colli of 8 x 2.5 kg bags
        let weight = packed_weight_kg(Decimal::from(10), Decimal::new(25, 1), 8);
        assert_eq!(weight, Decimal::from(200));
    }
}
