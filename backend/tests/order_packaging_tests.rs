//! Order and packaging tests
//!
//! Tests for the order lifecycle and packaging run figures:
//! - Orders only move forward one step at a time
//! - Packed weight from colli and product packaging
//! - Yield and loss percentages of a run

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    calculate_packaging_yield, colli_weight_kg, packed_weight_kg, validate_sorting_waste,
    OrderStatus,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const STATUSES: [OrderStatus; 3] = [OrderStatus::Open, OrderStatus::InProgress, OrderStatus::Done];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_order_lifecycle() {
        let status = OrderStatus::Open;
        let status = status.transition_to(OrderStatus::InProgress).unwrap();
        let status = status.transition_to(OrderStatus::Done).unwrap();
        assert_eq!(status, OrderStatus::Done);
        assert_eq!(status.next(), None);
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!OrderStatus::Open.can_transition_to(OrderStatus::Done));
        assert!(!OrderStatus::InProgress.can_transition_to(OrderStatus::Open));
        assert!(!OrderStatus::Done.can_transition_to(OrderStatus::InProgress));

        let err = OrderStatus::Done.transition_to(OrderStatus::Open).unwrap_err();
        assert_eq!(err.from, OrderStatus::Done);
        assert_eq!(err.to, OrderStatus::Open);
    }

    #[test]
    fn test_same_status_is_not_a_transition() {
        for status in STATUSES {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_done_orders_take_no_packaging() {
        assert!(OrderStatus::Open.accepts_packaging());
        assert!(OrderStatus::InProgress.accepts_packaging());
        assert!(!OrderStatus::Done.accepts_packaging());
    }

    #[test]
    fn test_status_codes() {
        for status in STATUSES {
            assert_eq!(OrderStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::from_str("CANCELLED").is_err());
        assert!(OrderStatus::from_str("open").is_err());
    }

    #[test]
    fn test_colli_weight() {
        // 4 bags of 2.5 kg
        assert_eq!(colli_weight_kg(dec("2.5"), 4), dec("10.0"));
        assert_eq!(packed_weight_kg(dec("40"), dec("2.5"), 4), dec("400.0"));
    }

    #[test]
    fn test_packaging_yield() {
        // 500 kg raw, 40 colli of 10 kg
        let packed = packed_weight_kg(dec("40"), dec("2.5"), 4);
        let result = calculate_packaging_yield(dec("500"), packed, dec("60"));

        assert_eq!(result.yield_percent, dec("80.00"));
        assert_eq!(result.loss_percent, dec("20.00"));
        assert_eq!(result.sorting_waste_kg, dec("60"));
    }

    #[test]
    fn test_yield_rounding() {
        let result = calculate_packaging_yield(dec("300"), dec("200"), Decimal::ZERO);
        assert_eq!(result.yield_percent, dec("66.67"));
        assert_eq!(result.loss_percent, dec("33.33"));
    }

    #[test]
    fn test_zero_raw_input() {
        let result = calculate_packaging_yield(Decimal::ZERO, dec("10"), Decimal::ZERO);
        assert_eq!(result.yield_percent, Decimal::ZERO);
        assert_eq!(result.loss_percent, Decimal::ZERO);
    }

    #[test]
    fn test_loss_floored_at_zero() {
        let result = calculate_packaging_yield(dec("100"), dec("102"), Decimal::ZERO);
        assert_eq!(result.yield_percent, dec("102.00"));
        assert_eq!(result.loss_percent, Decimal::ZERO);
    }

    #[test]
    fn test_yield_out_of_range_is_zero() {
        // A ratio beyond the decimal range reports no yield instead of panicking
        let result = calculate_packaging_yield(dec("0.001"), Decimal::MAX, Decimal::ZERO);
        assert_eq!(result.yield_percent, Decimal::ZERO);
        assert_eq!(result.loss_percent, Decimal::ZERO);
        assert_eq!(result.packed_weight_kg, Decimal::MAX);
    }

    #[test]
    fn test_packed_weight_saturates() {
        assert_eq!(packed_weight_kg(Decimal::MAX, dec("2.5"), 4), Decimal::MAX);
        assert_eq!(colli_weight_kg(Decimal::MAX, i32::MAX), Decimal::MAX);
    }

    #[test]
    fn test_sorting_waste_bounds() {
        assert!(validate_sorting_waste(dec("100"), dec("100")).is_ok());
        assert!(validate_sorting_waste(dec("100"), Decimal::ZERO).is_ok());
        assert!(validate_sorting_waste(dec("100"), dec("100.5")).is_err());
        assert!(validate_sorting_waste(dec("100"), dec("-1")).is_err());
        assert!(validate_sorting_waste(dec("100"), dec("10.0005")).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any sequence of requested transitions only ever visits statuses in order
    #[test]
    fn prop_status_never_moves_backwards(
        requests in prop::collection::vec(0usize..3, 0..20),
    ) {
        let mut status = OrderStatus::Open;
        let mut rank = 0usize;
        for idx in requests {
            if let Ok(next) = status.transition_to(STATUSES[idx]) {
                prop_assert_eq!(idx, rank + 1);
                status = next;
                rank = idx;
            }
        }
        prop_assert_eq!(status, STATUSES[rank]);
    }

    /// Yield and loss add up to 100 whenever something was lost
    #[test]
    fn prop_yield_and_loss_complement(
        raw_kg in 1u32..100_000u32,
        packed_share in 0u32..=100u32,
    ) {
        let raw = Decimal::from(raw_kg);
        let packed = raw * Decimal::from(packed_share) / Decimal::from(100);
        let result = calculate_packaging_yield(raw, packed, Decimal::ZERO);

        prop_assert!(result.yield_percent >= Decimal::ZERO);
        prop_assert!(result.loss_percent >= Decimal::ZERO);
        prop_assert_eq!(result.yield_percent + result.loss_percent, Decimal::from(100));
    }

    /// Packed weight scales linearly with the number of colli
    #[test]
    fn prop_packed_weight_linear(
        colli in 0u32..10_000u32,
        unit_grams in 100u32..25_000u32,
        units in 1i32..50,
    ) {
        let unit_weight = Decimal::new(i64::from(unit_grams), 3);
        let total = packed_weight_kg(Decimal::from(colli), unit_weight, units);
        prop_assert_eq!(total, Decimal::from(colli) * colli_weight_kg(unit_weight, units));
    }
}
