//! Report aggregation
//!
//! The backend fetches flat rows and the functions here fold them into the
//! weekly, per-cooking-type and per-farmer views the organizer works with.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CookingType;
use crate::types::IsoWeek;

/// A dated quantity of one cooking type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatedQuantity {
    pub date: NaiveDate,
    pub cooking_type: CookingType,
    pub quantity_kg: Decimal,
}

/// Total kg of one cooking type in one ISO week
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyCookingTypeTotal {
    pub iso_year: i32,
    pub iso_week: u32,
    pub cooking_type: CookingType,
    pub quantity_kg: Decimal,
}

/// Sum quantities per ISO week and cooking type, ordered by week then type
pub fn aggregate_weekly(entries: &[DatedQuantity]) -> Vec<WeeklyCookingTypeTotal> {
    let mut totals: BTreeMap<(IsoWeek, CookingType), Decimal> = BTreeMap::new();
    for entry in entries {
        let key = (IsoWeek::from_date(entry.date), entry.cooking_type);
        *totals.entry(key).or_insert(Decimal::ZERO) += entry.quantity_kg;
    }

    totals
        .into_iter()
        .map(|((week, cooking_type), quantity_kg)| WeeklyCookingTypeTotal {
            iso_year: week.year,
            iso_week: week.week,
            cooking_type,
            quantity_kg,
        })
        .collect()
}

/// Planned kg of one cooking type for one ISO week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedQuantity {
    pub week: IsoWeek,
    pub cooking_type: CookingType,
    pub planned_kg: Decimal,
}

/// Planned against delivered volume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanComparisonRow {
    pub iso_year: i32,
    pub iso_week: u32,
    pub cooking_type: CookingType,
    pub planned_kg: Decimal,
    pub delivered_kg: Decimal,
    pub difference_kg: Decimal,
    /// delivered / planned * 100, absent when nothing was planned
    pub fulfilment_percent: Option<Decimal>,
}

/// Compare delivery plans with actual deliveries per week and cooking type.
/// Weeks that appear on either side are reported.
pub fn compare_plan(plans: &[PlannedQuantity], deliveries: &[DatedQuantity]) -> Vec<PlanComparisonRow> {
    let mut rows: BTreeMap<(IsoWeek, CookingType), (Decimal, Decimal)> = BTreeMap::new();

    for plan in plans {
        rows.entry((plan.week, plan.cooking_type))
            .or_insert((Decimal::ZERO, Decimal::ZERO))
            .0 += plan.planned_kg;
    }
    for delivery in deliveries {
        rows.entry((IsoWeek::from_date(delivery.date), delivery.cooking_type))
            .or_insert((Decimal::ZERO, Decimal::ZERO))
            .1 += delivery.quantity_kg;
    }

    rows.into_iter()
        .map(|((week, cooking_type), (planned_kg, delivered_kg))| PlanComparisonRow {
            iso_year: week.year,
            iso_week: week.week,
            cooking_type,
            planned_kg,
            delivered_kg,
            difference_kg: delivered_kg - planned_kg,
            fulfilment_percent: percent_of(delivered_kg, planned_kg),
        })
        .collect()
}

/// A quantity of one variety held somewhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarietyQuantity {
    pub variety_id: Uuid,
    pub variety_name: String,
    pub cooking_type: CookingType,
    pub quantity_kg: Decimal,
}

/// Total per cooking type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookingTypeTotal {
    pub cooking_type: CookingType,
    pub quantity_kg: Decimal,
    pub variety_count: usize,
}

/// Sum variety quantities per cooking type. Every cooking type is listed,
/// zero when nothing of that type is present.
pub fn sum_by_cooking_type(lines: &[VarietyQuantity]) -> Vec<CookingTypeTotal> {
    CookingType::ALL
        .into_iter()
        .map(|cooking_type| {
            let mut varieties: Vec<Uuid> = Vec::new();
            let mut quantity_kg = Decimal::ZERO;
            for line in lines.iter().filter(|l| l.cooking_type == cooking_type) {
                quantity_kg += line.quantity_kg;
                if !varieties.contains(&line.variety_id) {
                    varieties.push(line.variety_id);
                }
            }
            CookingTypeTotal {
                cooking_type,
                quantity_kg,
                variety_count: varieties.len(),
            }
        })
        .collect()
}

/// Raw stock at the packing stations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInventoryReport {
    pub by_cooking_type: Vec<CookingTypeTotal>,
    pub varieties: Vec<RawInventoryLine>,
    pub total_kg: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawInventoryLine {
    pub variety_id: Uuid,
    pub variety_name: String,
    pub cooking_type: CookingType,
    pub quantity_kg: Decimal,
}

/// Build the raw inventory view, merging station rows of the same variety
pub fn raw_inventory(lines: &[VarietyQuantity]) -> RawInventoryReport {
    let mut merged: BTreeMap<(CookingType, String, Uuid), Decimal> = BTreeMap::new();
    for line in lines {
        *merged
            .entry((line.cooking_type, line.variety_name.clone(), line.variety_id))
            .or_insert(Decimal::ZERO) += line.quantity_kg;
    }

    let varieties: Vec<RawInventoryLine> = merged
        .into_iter()
        .map(|((cooking_type, variety_name, variety_id), quantity_kg)| RawInventoryLine {
            variety_id,
            variety_name,
            cooking_type,
            quantity_kg,
        })
        .collect();

    RawInventoryReport {
        by_cooking_type: sum_by_cooking_type(lines),
        total_kg: varieties.iter().map(|v| v.quantity_kg).sum(),
        varieties,
    }
}

/// One delivery as seen by the farmer statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmerDeliveryLine {
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub variety_id: Uuid,
    pub variety_name: String,
    pub cooking_type: CookingType,
    pub quantity_kg: Decimal,
    pub payout: Decimal,
}

/// Delivery statistics of one farmer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FarmerStatistics {
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub delivery_count: usize,
    pub delivered_kg: Decimal,
    pub payout: Decimal,
    pub current_stock_kg: Decimal,
    pub by_cooking_type: Vec<CookingTypeTotal>,
}

/// Group deliveries per farmer. `stock` carries each farmer's current stock;
/// farmers with stock but no deliveries are listed too.
pub fn farmer_statistics(
    deliveries: &[FarmerDeliveryLine],
    stock: &BTreeMap<Uuid, (String, Decimal)>,
) -> Vec<FarmerStatistics> {
    let mut by_farmer: BTreeMap<Uuid, (String, Vec<&FarmerDeliveryLine>)> = BTreeMap::new();
    for line in deliveries {
        by_farmer
            .entry(line.farmer_id)
            .or_insert_with(|| (line.farmer_name.clone(), Vec::new()))
            .1
            .push(line);
    }
    for (farmer_id, (name, _)) in stock {
        by_farmer
            .entry(*farmer_id)
            .or_insert_with(|| (name.clone(), Vec::new()));
    }

    let mut stats: Vec<FarmerStatistics> = by_farmer
        .into_iter()
        .map(|(farmer_id, (farmer_name, lines))| {
            let quantities: Vec<VarietyQuantity> = lines
                .iter()
                .map(|l| VarietyQuantity {
                    variety_id: l.variety_id,
                    variety_name: l.variety_name.clone(),
                    cooking_type: l.cooking_type,
                    quantity_kg: l.quantity_kg,
                })
                .collect();

            FarmerStatistics {
                farmer_id,
                farmer_name,
                delivery_count: lines.len(),
                delivered_kg: lines.iter().map(|l| l.quantity_kg).sum(),
                payout: lines.iter().map(|l| l.payout).sum(),
                current_stock_kg: stock
                    .get(&farmer_id)
                    .map(|(_, qty)| *qty)
                    .unwrap_or(Decimal::ZERO),
                by_cooking_type: sum_by_cooking_type(&quantities),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.delivered_kg.cmp(&a.delivered_kg).then(a.farmer_name.cmp(&b.farmer_name)));
    stats
}

/// Cost and revenue totals over a period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfitAndLossInputs {
    pub revenue: Decimal,
    pub farmer_payments: Decimal,
    pub packing_costs: Decimal,
    pub complaint_costs: Decimal,
    pub manual_costs: Decimal,
    pub colli_sold: i64,
}

/// Profit and loss statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfitAndLoss {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub currency: String,
    pub revenue: Decimal,
    pub farmer_payments: Decimal,
    pub packing_costs: Decimal,
    pub complaint_costs: Decimal,
    pub manual_costs: Decimal,
    pub total_costs: Decimal,
    pub result: Decimal,
    pub colli_sold: i64,
    /// Price per colli at which revenue would cover all costs
    pub break_even_price_per_colli: Option<Decimal>,
}

impl ProfitAndLoss {
    pub fn compute(from: NaiveDate, to: NaiveDate, currency: &str, inputs: ProfitAndLossInputs) -> Self {
        let total_costs =
            inputs.farmer_payments + inputs.packing_costs + inputs.complaint_costs + inputs.manual_costs;

        Self {
            from,
            to,
            currency: currency.to_string(),
            revenue: inputs.revenue,
            farmer_payments: inputs.farmer_payments,
            packing_costs: inputs.packing_costs,
            complaint_costs: inputs.complaint_costs,
            manual_costs: inputs.manual_costs,
            total_costs,
            result: inputs.revenue - total_costs,
            colli_sold: inputs.colli_sold,
            break_even_price_per_colli: break_even_price(total_costs, inputs.colli_sold),
        }
    }
}

/// Total costs spread over the colli sold, rounded to cents
pub fn break_even_price(total_costs: Decimal, colli_sold: i64) -> Option<Decimal> {
    if colli_sold <= 0 {
        return None;
    }
    total_costs
        .checked_div(Decimal::from(colli_sold))
        .map(|p| p.round_dp(2))
}

/// `part / whole * 100` rounded to two places, `None` when `whole` is zero
/// or the ratio leaves the decimal range
pub fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    part.checked_div(whole)
        .and_then(|r| r.checked_mul(Decimal::from(100)))
        .map(|p| p.round_dp(2))
}
