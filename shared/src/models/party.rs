//! Cooperative members and trading partners

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// Kinds of parties the cooperative deals with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Farmer,
    PackingStation,
    PackingPlant,
    Customer,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Farmer => "farmer",
            PartyKind::PackingStation => "packing_station",
            PartyKind::PackingPlant => "packing_plant",
            PartyKind::Customer => "customer",
        }
    }

    /// Human readable label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            PartyKind::Farmer => "Farmer",
            PartyKind::PackingStation => "Packing station",
            PartyKind::PackingPlant => "Packing plant",
            PartyKind::Customer => "Customer",
        }
    }
}

impl std::str::FromStr for PartyKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(PartyKind::Farmer),
            "packing_station" => Ok(PartyKind::PackingStation),
            "packing_plant" => Ok(PartyKind::PackingPlant),
            "customer" => Ok(PartyKind::Customer),
            other => Err(UnknownVariant::new("party kind", other)),
        }
    }
}

/// A farmer, packing station, packing plant or customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: Uuid,
    pub kind: PartyKind,
    pub name: String,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
