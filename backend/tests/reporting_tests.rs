//! Reporting tests
//!
//! Tests for the report aggregations:
//! - Weekly totals per cooking type on ISO weeks
//! - Delivery plans against actual deliveries
//! - Raw inventory and farmer statistics
//! - Profit and loss with break-even price

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    aggregate_weekly, break_even_price, compare_plan, farmer_statistics, percent_of, raw_inventory,
    validate_iso_week, widen_to_iso_weeks, CookingType, DatedQuantity, FarmerDeliveryLine, IsoWeek,
    PlannedQuantity, ProfitAndLoss, ProfitAndLossInputs, VarietyQuantity,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn delivered(day: &str, cooking_type: CookingType, kg: &str) -> DatedQuantity {
    DatedQuantity {
        date: date(day),
        cooking_type,
        quantity_kg: dec(kg),
    }
}

fn cooking_type_strategy() -> impl Strategy<Value = CookingType> {
    prop::sample::select(CookingType::ALL.to_vec())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_iso_week_boundaries() {
        // Sunday 2021-01-03 is still in 2020-W53
        assert_eq!(IsoWeek::from_date(date("2021-01-03")).to_string(), "2020-W53");
        assert_eq!(IsoWeek::from_date(date("2021-01-04")).to_string(), "2021-W01");
        // Monday 2024-12-30 already belongs to 2025
        assert_eq!(IsoWeek::from_date(date("2024-12-30")).to_string(), "2025-W01");

        let week = IsoWeek::new(2024, 7).unwrap();
        assert_eq!(week.first_day(), Some(date("2024-02-12")));
        assert_eq!(week.last_day(), Some(date("2024-02-18")));
    }

    #[test]
    fn test_plan_week_validation() {
        assert!(validate_iso_week(2020, 53).is_ok());
        assert!(validate_iso_week(2021, 53).is_err());
        assert!(validate_iso_week(2024, 0).is_err());
        assert!(validate_iso_week(1999, 10).is_err());
    }

    #[test]
    fn test_weekly_aggregation() {
        let entries = vec![
            delivered("2024-02-12", CookingType::Waxy, "100"),
            delivered("2024-02-18", CookingType::Waxy, "50.5"),
            delivered("2024-02-14", CookingType::Floury, "30"),
            delivered("2024-02-19", CookingType::Waxy, "10"),
        ];

        let totals = aggregate_weekly(&entries);
        assert_eq!(totals.len(), 3);

        assert_eq!((totals[0].iso_year, totals[0].iso_week), (2024, 7));
        assert_eq!(totals[0].cooking_type, CookingType::Waxy);
        assert_eq!(totals[0].quantity_kg, dec("150.5"));

        assert_eq!(totals[1].cooking_type, CookingType::Floury);
        assert_eq!(totals[1].quantity_kg, dec("30"));

        assert_eq!(totals[2].iso_week, 8);
        assert_eq!(totals[2].quantity_kg, dec("10"));
    }

    #[test]
    fn test_plan_comparison() {
        let week7 = IsoWeek::new(2024, 7).unwrap();
        let week8 = IsoWeek::new(2024, 8).unwrap();
        let plans = vec![
            PlannedQuantity {
                week: week7,
                cooking_type: CookingType::Waxy,
                planned_kg: dec("200"),
            },
            PlannedQuantity {
                week: week8,
                cooking_type: CookingType::Floury,
                planned_kg: dec("100"),
            },
        ];
        let deliveries = vec![
            delivered("2024-02-13", CookingType::Waxy, "150"),
            delivered("2024-02-14", CookingType::MostlyWaxy, "40"),
        ];

        let rows = compare_plan(&plans, &deliveries);
        assert_eq!(rows.len(), 3);

        let waxy = &rows[0];
        assert_eq!(waxy.cooking_type, CookingType::Waxy);
        assert_eq!(waxy.difference_kg, dec("-50"));
        assert_eq!(waxy.fulfilment_percent, Some(dec("75.00")));

        // Delivered without a plan
        let unplanned = &rows[1];
        assert_eq!(unplanned.cooking_type, CookingType::MostlyWaxy);
        assert_eq!(unplanned.planned_kg, Decimal::ZERO);
        assert_eq!(unplanned.fulfilment_percent, None);

        // Planned but nothing delivered
        let missing = &rows[2];
        assert_eq!(missing.iso_week, 8);
        assert_eq!(missing.delivered_kg, Decimal::ZERO);
        assert_eq!(missing.fulfilment_percent, Some(Decimal::ZERO));
    }

    #[test]
    fn test_raw_inventory_merges_stations() {
        let annabelle = Uuid::new_v4();
        let agria = Uuid::new_v4();
        let lines = vec![
            VarietyQuantity {
                variety_id: annabelle,
                variety_name: "Annabelle".to_string(),
                cooking_type: CookingType::Waxy,
                quantity_kg: dec("300"),
            },
            VarietyQuantity {
                variety_id: annabelle,
                variety_name: "Annabelle".to_string(),
                cooking_type: CookingType::Waxy,
                quantity_kg: dec("200"),
            },
            VarietyQuantity {
                variety_id: agria,
                variety_name: "Agria".to_string(),
                cooking_type: CookingType::MostlyWaxy,
                quantity_kg: dec("120"),
            },
        ];

        let report = raw_inventory(&lines);
        assert_eq!(report.varieties.len(), 2);
        assert_eq!(report.total_kg, dec("620"));
        assert_eq!(report.varieties[0].variety_name, "Annabelle");
        assert_eq!(report.varieties[0].quantity_kg, dec("500"));

        assert_eq!(report.by_cooking_type.len(), 3);
        let waxy = &report.by_cooking_type[0];
        assert_eq!(waxy.quantity_kg, dec("500"));
        assert_eq!(waxy.variety_count, 1);
        let floury = &report.by_cooking_type[2];
        assert_eq!(floury.cooking_type, CookingType::Floury);
        assert_eq!(floury.quantity_kg, Decimal::ZERO);
    }

    #[test]
    fn test_plan_comparison_counts_whole_weeks() {
        // A mid-week range still compares the full week 7 on both sides
        let week7 = IsoWeek::new(2024, 7).unwrap();
        let plans = vec![PlannedQuantity {
            week: week7,
            cooking_type: CookingType::Waxy,
            planned_kg: dec("200"),
        }];
        let recorded = vec![
            delivered("2024-02-12", CookingType::Waxy, "80"),
            delivered("2024-02-14", CookingType::Waxy, "70"),
            delivered("2024-02-18", CookingType::Waxy, "50"),
            delivered("2024-02-19", CookingType::Waxy, "500"),
        ];

        let (from, to) = widen_to_iso_weeks(Some(date("2024-02-14")), Some(date("2024-02-14")));
        assert_eq!(from, Some(date("2024-02-12")));
        assert_eq!(to, Some(date("2024-02-18")));

        let in_range: Vec<DatedQuantity> = recorded
            .into_iter()
            .filter(|d| from.map_or(true, |f| d.date >= f) && to.map_or(true, |t| d.date <= t))
            .collect();
        let rows = compare_plan(&plans, &in_range);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].delivered_kg, dec("200"));
        assert_eq!(rows[0].fulfilment_percent, Some(dec("100.00")));
    }

    #[test]
    fn test_inactive_farmer_keeps_stock_with_deliveries() {
        // The stock map holds a deactivated farmer because they delivered in the range
        let retired = Uuid::new_v4();
        let deliveries = vec![FarmerDeliveryLine {
            farmer_id: retired,
            farmer_name: "Hof Alt".to_string(),
            variety_id: Uuid::new_v4(),
            variety_name: "Linda".to_string(),
            cooking_type: CookingType::MostlyWaxy,
            quantity_kg: dec("120"),
            payout: dec("42.00"),
        }];
        let mut stock = BTreeMap::new();
        stock.insert(retired, ("Hof Alt".to_string(), dec("30.5")));

        let stats = farmer_statistics(&deliveries, &stock);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].delivered_kg, dec("120"));
        assert_eq!(stats[0].current_stock_kg, dec("30.5"));
    }

    #[test]
    fn test_farmer_statistics() {
        let farmer_a = Uuid::new_v4();
        let farmer_b = Uuid::new_v4();
        let idle = Uuid::new_v4();
        let variety = Uuid::new_v4();

        let line = |farmer_id, name: &str, kg: &str, payout: &str| FarmerDeliveryLine {
            farmer_id,
            farmer_name: name.to_string(),
            variety_id: variety,
            variety_name: "Annabelle".to_string(),
            cooking_type: CookingType::Waxy,
            quantity_kg: dec(kg),
            payout: dec(payout),
        };
        let deliveries = vec![
            line(farmer_a, "Hof Abel", "100", "35.00"),
            line(farmer_b, "Hof Berg", "400", "140.00"),
            line(farmer_a, "Hof Abel", "200", "70.00"),
        ];

        let mut stock = BTreeMap::new();
        stock.insert(farmer_a, ("Hof Abel".to_string(), dec("50")));
        stock.insert(idle, ("Hof Ruhe".to_string(), dec("900")));

        let stats = farmer_statistics(&deliveries, &stock);
        assert_eq!(stats.len(), 3);

        assert_eq!(stats[0].farmer_id, farmer_b);
        assert_eq!(stats[0].current_stock_kg, Decimal::ZERO);

        assert_eq!(stats[1].farmer_id, farmer_a);
        assert_eq!(stats[1].delivery_count, 2);
        assert_eq!(stats[1].delivered_kg, dec("300"));
        assert_eq!(stats[1].payout, dec("105.00"));
        assert_eq!(stats[1].current_stock_kg, dec("50"));

        assert_eq!(stats[2].farmer_name, "Hof Ruhe");
        assert_eq!(stats[2].delivery_count, 0);
        assert_eq!(stats[2].current_stock_kg, dec("900"));
    }

    #[test]
    fn test_profit_and_loss() {
        let inputs = ProfitAndLossInputs {
            revenue: dec("5000"),
            farmer_payments: dec("2100"),
            packing_costs: dec("400"),
            complaint_costs: dec("120"),
            manual_costs: dec("380"),
            colli_sold: 400,
        };

        let statement = ProfitAndLoss::compute(date("2024-02-01"), date("2024-02-29"), "EUR", inputs);
        assert_eq!(statement.total_costs, dec("3000"));
        assert_eq!(statement.result, dec("2000"));
        assert_eq!(statement.break_even_price_per_colli, Some(dec("7.50")));
        assert_eq!(statement.currency, "EUR");
    }

    #[test]
    fn test_loss_making_period() {
        let inputs = ProfitAndLossInputs {
            revenue: dec("100"),
            manual_costs: dec("250"),
            ..Default::default()
        };

        let statement = ProfitAndLoss::compute(date("2024-01-01"), date("2024-01-31"), "EUR", inputs);
        assert_eq!(statement.result, dec("-150"));
        assert_eq!(statement.break_even_price_per_colli, None);
    }

    #[test]
    fn test_break_even_rounding() {
        assert_eq!(break_even_price(dec("100"), 3), Some(dec("33.33")));
        assert_eq!(break_even_price(dec("100"), 0), None);
        assert_eq!(break_even_price(dec("100"), -1), None);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec("1"), dec("3")), Some(dec("33.33")));
        assert_eq!(percent_of(dec("5"), Decimal::ZERO), None);
        assert_eq!(percent_of(Decimal::MAX, dec("0.001")), None);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Weekly aggregation neither loses nor invents quantity
    #[test]
    fn prop_weekly_totals_preserve_sum(
        entries in prop::collection::vec(
            (0i64..730, cooking_type_strategy(), 1i64..1_000_000i64),
            0..50,
        ),
    ) {
        let start = date("2023-01-01");
        let entries: Vec<DatedQuantity> = entries
            .into_iter()
            .map(|(offset, cooking_type, milli)| DatedQuantity {
                date: start + Duration::days(offset),
                cooking_type,
                quantity_kg: Decimal::new(milli, 3),
            })
            .collect();

        let totals = aggregate_weekly(&entries);
        let input_sum: Decimal = entries.iter().map(|e| e.quantity_kg).sum();
        let output_sum: Decimal = totals.iter().map(|t| t.quantity_kg).sum();
        prop_assert_eq!(input_sum, output_sum);

        // One row per (week, cooking type), in order
        for pair in totals.windows(2) {
            let a = (pair[0].iso_year, pair[0].iso_week, pair[0].cooking_type);
            let b = (pair[1].iso_year, pair[1].iso_week, pair[1].cooking_type);
            prop_assert!(a < b);
        }
    }

    /// The result is revenue minus every cost component
    #[test]
    fn prop_result_is_revenue_minus_costs(
        revenue in 0i64..10_000_000,
        farmer in 0i64..1_000_000,
        packing in 0i64..1_000_000,
        complaints in 0i64..1_000_000,
        manual in 0i64..1_000_000,
        colli in 0i64..100_000,
    ) {
        let inputs = ProfitAndLossInputs {
            revenue: Decimal::new(revenue, 2),
            farmer_payments: Decimal::new(farmer, 2),
            packing_costs: Decimal::new(packing, 2),
            complaint_costs: Decimal::new(complaints, 2),
            manual_costs: Decimal::new(manual, 2),
            colli_sold: colli,
        };
        let statement = ProfitAndLoss::compute(date("2024-01-01"), date("2024-12-31"), "EUR", inputs);

        prop_assert_eq!(
            statement.result,
            inputs.revenue
                - inputs.farmer_payments
                - inputs.packing_costs
                - inputs.complaint_costs
                - inputs.manual_costs
        );
        prop_assert_eq!(statement.break_even_price_per_colli.is_some(), colli > 0);
    }
}
