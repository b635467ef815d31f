//! Stock ledger models
//!
//! Farmers, packing stations and packing plants each keep an append-only list
//! of stock movements and a current balance per item. The rules in this module
//! decide whether a movement may be applied; persistence lives in the backend.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{PartyKind, UnknownVariant};
use crate::validation::MAX_QUANTITY;

/// Owner of a stock ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StockOwnerKind {
    /// Raw potatoes at the farm, per variety, in kg
    Farmer,
    /// Raw potatoes delivered to the station, per variety, in kg
    PackingStation,
    /// Finished product, per product, in colli
    PackingPlant,
}

/// What a ledger counts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockItemKind {
    Variety,
    Product,
}

impl StockOwnerKind {
    pub const ALL: [StockOwnerKind; 3] = [
        StockOwnerKind::Farmer,
        StockOwnerKind::PackingStation,
        StockOwnerKind::PackingPlant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StockOwnerKind::Farmer => "farmer",
            StockOwnerKind::PackingStation => "packing_station",
            StockOwnerKind::PackingPlant => "packing_plant",
        }
    }

    pub fn party_kind(&self) -> PartyKind {
        match self {
            StockOwnerKind::Farmer => PartyKind::Farmer,
            StockOwnerKind::PackingStation => PartyKind::PackingStation,
            StockOwnerKind::PackingPlant => PartyKind::PackingPlant,
        }
    }

    pub fn item_kind(&self) -> StockItemKind {
        match self {
            StockOwnerKind::Farmer | StockOwnerKind::PackingStation => StockItemKind::Variety,
            StockOwnerKind::PackingPlant => StockItemKind::Product,
        }
    }

    /// Unit of the balance quantity
    pub fn unit(&self) -> &'static str {
        match self.item_kind() {
            StockItemKind::Variety => "kg",
            StockItemKind::Product => "colli",
        }
    }
}

impl std::str::FromStr for StockOwnerKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(StockOwnerKind::Farmer),
            "packing_station" => Ok(StockOwnerKind::PackingStation),
            "packing_plant" => Ok(StockOwnerKind::PackingPlant),
            other => Err(UnknownVariant::new("stock owner", other)),
        }
    }
}

/// Reason code carried by every stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementReason {
    Harvest,
    DeliveryToPacker,
    DirectSale,
    DeliveryCancelled,
    RawInFromFarmer,
    RawOutToPackaging,
    PackagedIn,
    SaleOut,
    ReturnIn,
    Loss,
    Inventory,
}

/// Required sign of a movement's change amount
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignRule {
    Positive,
    Negative,
    Either,
}

impl MovementReason {
    pub const ALL: [MovementReason; 11] = [
        MovementReason::Harvest,
        MovementReason::DeliveryToPacker,
        MovementReason::DirectSale,
        MovementReason::DeliveryCancelled,
        MovementReason::RawInFromFarmer,
        MovementReason::RawOutToPackaging,
        MovementReason::PackagedIn,
        MovementReason::SaleOut,
        MovementReason::ReturnIn,
        MovementReason::Loss,
        MovementReason::Inventory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Harvest => "HARVEST",
            MovementReason::DeliveryToPacker => "DELIVERY_TO_PACKER",
            MovementReason::DirectSale => "DIRECT_SALE",
            MovementReason::DeliveryCancelled => "DELIVERY_CANCELLED",
            MovementReason::RawInFromFarmer => "RAW_IN_FROM_FARMER",
            MovementReason::RawOutToPackaging => "RAW_OUT_TO_PACKAGING",
            MovementReason::PackagedIn => "PACKAGED_IN",
            MovementReason::SaleOut => "SALE_OUT",
            MovementReason::ReturnIn => "RETURN_IN",
            MovementReason::Loss => "LOSS",
            MovementReason::Inventory => "INVENTORY",
        }
    }

    /// Whether the reason may appear in the given owner's ledger
    pub fn allowed_for(&self, owner: StockOwnerKind) -> bool {
        use MovementReason::*;
        use StockOwnerKind::*;

        match self {
            Harvest | DeliveryToPacker | DirectSale => owner == Farmer,
            DeliveryCancelled => matches!(owner, Farmer | PackingStation),
            RawInFromFarmer | RawOutToPackaging => owner == PackingStation,
            PackagedIn | SaleOut | ReturnIn => owner == PackingPlant,
            Loss | Inventory => true,
        }
    }

    pub fn sign_rule(&self) -> SignRule {
        use MovementReason::*;

        match self {
            Harvest | RawInFromFarmer | PackagedIn | ReturnIn => SignRule::Positive,
            DeliveryToPacker | DirectSale | RawOutToPackaging | SaleOut | Loss => SignRule::Negative,
            DeliveryCancelled | Inventory => SignRule::Either,
        }
    }

    /// Reasons that may be booked directly through the stock API.
    /// Everything else is written by the workflow that owns the transaction.
    pub fn is_manual(&self) -> bool {
        matches!(self, MovementReason::Harvest | MovementReason::Loss)
    }
}

impl std::str::FromStr for MovementReason {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementReason::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("movement reason", s))
    }
}

impl std::fmt::Display for MovementReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a movement is refused
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    #[error("reason {reason} is not valid for {owner} stock")]
    ReasonNotAllowed {
        reason: MovementReason,
        owner: &'static str,
    },

    #[error("change amount must not be zero")]
    ZeroChange,

    #[error("reason {reason} requires a {expected} change amount")]
    WrongSign {
        reason: MovementReason,
        expected: &'static str,
    },

    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("balance {current} cannot take a change of {change}")]
    OutOfRange { current: Decimal, change: Decimal },
}

/// Validate a movement against the current balance and return the new balance
pub fn check_movement(
    owner: StockOwnerKind,
    reason: MovementReason,
    change: Decimal,
    current: Decimal,
    allow_negative: bool,
) -> Result<Decimal, StockError> {
    if !reason.allowed_for(owner) {
        return Err(StockError::ReasonNotAllowed {
            reason,
            owner: owner.as_str(),
        });
    }

    if change.is_zero() {
        return Err(StockError::ZeroChange);
    }

    match reason.sign_rule() {
        SignRule::Positive if change < Decimal::ZERO => {
            return Err(StockError::WrongSign {
                reason,
                expected: "positive",
            });
        }
        SignRule::Negative if change > Decimal::ZERO => {
            return Err(StockError::WrongSign {
                reason,
                expected: "negative",
            });
        }
        _ => {}
    }

    let new_balance = current
        .checked_add(change)
        .filter(|b| b.abs() < MAX_QUANTITY)
        .ok_or(StockError::OutOfRange { current, change })?;
    if new_balance < Decimal::ZERO && !allow_negative {
        return Err(StockError::InsufficientStock {
            available: current,
            requested: -change,
        });
    }

    Ok(new_balance)
}

/// Change needed to bring a balance in line with a physical count.
/// `None` when the count matches and no movement should be written.
pub fn inventory_delta(current: Decimal, counted: Decimal) -> Option<Decimal> {
    let delta = counted - current;
    if delta.is_zero() {
        None
    } else {
        Some(delta)
    }
}

/// An immutable stock movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub owner_kind: StockOwnerKind,
    pub owner_id: Uuid,
    pub item_id: Uuid,
    pub change_amount: Decimal,
    pub reason: MovementReason,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Current quantity of one item held by one owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBalance {
    pub owner_kind: StockOwnerKind,
    pub owner_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub updated_at: DateTime<Utc>,
}

/// Reference from a movement back to the transaction that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementReference {
    pub kind: &'static str,
    pub id: Uuid,
}

impl MovementReference {
    pub fn delivery(id: Uuid) -> Self {
        Self { kind: "delivery", id }
    }

    pub fn direct_sale(id: Uuid) -> Self {
        Self { kind: "direct_sale", id }
    }

    pub fn packaging_run(id: Uuid) -> Self {
        Self { kind: "packaging_run", id }
    }

    pub fn sale(id: Uuid) -> Self {
        Self { kind: "sale", id }
    }

    pub fn complaint(id: Uuid) -> Self {
        Self { kind: "complaint", id }
    }
}

/// Rebuild balances from movements, keyed by (owner, item)
pub fn replay_balances<I>(movements: I) -> BTreeMap<(Uuid, Uuid), Decimal>
where
    I: IntoIterator<Item = (Uuid, Uuid, Decimal)>,
{
    let mut balances = BTreeMap::new();
    for (owner_id, item_id, change) in movements {
        *balances.entry((owner_id, item_id)).or_insert(Decimal::ZERO) += change;
    }
    balances
}

/// A balance that disagrees with the sum of its movements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceMismatch {
    pub owner_id: Uuid,
    pub item_id: Uuid,
    pub balance: Decimal,
    pub movement_sum: Decimal,
    pub difference: Decimal,
}

/// Compare stored balances with replayed movement sums.
/// Pairs present on only one side count as zero on the other.
pub fn find_mismatches(
    balances: &BTreeMap<(Uuid, Uuid), Decimal>,
    movement_sums: &BTreeMap<(Uuid, Uuid), Decimal>,
) -> Vec<BalanceMismatch> {
    let mut keys: Vec<&(Uuid, Uuid)> = balances.keys().chain(movement_sums.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter_map(|key| {
            let balance = balances.get(key).copied().unwrap_or(Decimal::ZERO);
            let movement_sum = movement_sums.get(key).copied().unwrap_or(Decimal::ZERO);
            (balance != movement_sum).then(|| BalanceMismatch {
                owner_id: key.0,
                item_id: key.1,
                balance,
                movement_sum,
                difference: balance - movement_sum,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reason_is_valid_for_some_owner() {
        for reason in MovementReason::ALL {
            assert!(
                StockOwnerKind::ALL.iter().any(|o| reason.allowed_for(*o)),
                "{reason} is unusable"
            );
        }
    }

    #[test]
    fn raw_in_only_at_station() {
        assert!(MovementReason::RawInFromFarmer.allowed_for(StockOwnerKind::PackingStation));
        assert!(!MovementReason::RawInFromFarmer.allowed_for(StockOwnerKind::Farmer));
        assert!(!MovementReason::RawInFromFarmer.allowed_for(StockOwnerKind::PackingPlant));
    }

    #[test]
    fn mismatch_detects_missing_balance_row() {
        let owner = Uuid::new_v4();
        let item = Uuid::new_v4();
        let balances = BTreeMap::new();
        let sums = replay_balances([(owner, item, Decimal::from(5))]);

        let mismatches = find_mismatches(&balances, &sums);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].difference, Decimal::from(-5));
    }

    #[test]
    fn wire_codes() {
        assert_eq!(
            serde_json::to_string(&MovementReason::RawOutToPackaging).unwrap(),
            "\"RAW_OUT_TO_PACKAGING\""
        );
        let kind: StockOwnerKind = serde_json::from_str("\"packing_plant\"").unwrap();
        assert_eq!(kind, StockOwnerKind::PackingPlant);
        for reason in MovementReason::ALL {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.as_str()));
        }
    }
}
