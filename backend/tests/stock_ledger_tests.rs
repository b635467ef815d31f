//! Stock ledger tests
//!
//! Tests for the movement rules shared by the farmer, packing-station and
//! packing-plant ledgers:
//! - Reason codes are only accepted by the ledgers they belong to
//! - Sign rules per reason
//! - Balances never go negative unless explicitly allowed
//! - Replaying movements reproduces the balances
//! - Quantities are exact at the stored precision and balances stay in range

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    check_movement, find_mismatches, inventory_delta, replay_balances, validate_counted_quantity,
    validate_positive_quantity, MovementReason, SignRule, StockError, StockOwnerKind, MAX_QUANTITY,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn owner_strategy() -> impl Strategy<Value = StockOwnerKind> {
    prop::sample::select(StockOwnerKind::ALL.to_vec())
}

fn reason_strategy() -> impl Strategy<Value = MovementReason> {
    prop::sample::select(MovementReason::ALL.to_vec())
}

/// Quantities with three decimal places, as stored
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|milli| Decimal::new(milli, 3))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_reason_codes_round_trip() {
        for reason in MovementReason::ALL {
            assert_eq!(MovementReason::from_str(reason.as_str()).unwrap(), reason);
        }
        assert!(MovementReason::from_str("SHRINKAGE").is_err());
    }

    #[test]
    fn test_reason_table() {
        use MovementReason::*;
        use StockOwnerKind::*;

        let farmer_only = [Harvest, DeliveryToPacker, DirectSale];
        for reason in farmer_only {
            assert!(reason.allowed_for(Farmer));
            assert!(!reason.allowed_for(PackingStation));
            assert!(!reason.allowed_for(PackingPlant));
        }

        assert!(DeliveryCancelled.allowed_for(Farmer));
        assert!(DeliveryCancelled.allowed_for(PackingStation));
        assert!(!DeliveryCancelled.allowed_for(PackingPlant));

        for reason in [RawInFromFarmer, RawOutToPackaging] {
            assert!(reason.allowed_for(PackingStation));
            assert!(!reason.allowed_for(Farmer));
        }

        for reason in [PackagedIn, SaleOut, ReturnIn] {
            assert!(reason.allowed_for(PackingPlant));
            assert!(!reason.allowed_for(PackingStation));
        }

        for owner in StockOwnerKind::ALL {
            assert!(Loss.allowed_for(owner));
            assert!(Inventory.allowed_for(owner));
        }
    }

    #[test]
    fn test_only_harvest_and_loss_are_manual() {
        let manual: Vec<_> = MovementReason::ALL.into_iter().filter(|r| r.is_manual()).collect();
        assert_eq!(manual, vec![MovementReason::Harvest, MovementReason::Loss]);
    }

    #[test]
    fn test_delivery_moves_stock() {
        let farmer = check_movement(
            StockOwnerKind::Farmer,
            MovementReason::DeliveryToPacker,
            dec("-500"),
            dec("1200"),
            false,
        )
        .unwrap();
        let station = check_movement(
            StockOwnerKind::PackingStation,
            MovementReason::RawInFromFarmer,
            dec("500"),
            Decimal::ZERO,
            false,
        )
        .unwrap();

        assert_eq!(farmer, dec("700"));
        assert_eq!(station, dec("500"));
    }

    #[test]
    fn test_wrong_ledger_rejected() {
        let err = check_movement(
            StockOwnerKind::PackingPlant,
            MovementReason::Harvest,
            dec("10"),
            Decimal::ZERO,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, StockError::ReasonNotAllowed { .. }));
    }

    #[test]
    fn test_zero_change_rejected() {
        let err = check_movement(
            StockOwnerKind::Farmer,
            MovementReason::Inventory,
            Decimal::ZERO,
            dec("10"),
            false,
        )
        .unwrap_err();
        assert_eq!(err, StockError::ZeroChange);
    }

    #[test]
    fn test_sale_beyond_stock_rejected() {
        let err = check_movement(
            StockOwnerKind::PackingPlant,
            MovementReason::SaleOut,
            dec("-30"),
            dec("20"),
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                available: dec("20"),
                requested: dec("30"),
            }
        );
    }

    #[test]
    fn test_negative_allowed_when_configured() {
        let balance = check_movement(
            StockOwnerKind::PackingPlant,
            MovementReason::SaleOut,
            dec("-30"),
            dec("20"),
            true,
        )
        .unwrap();
        assert_eq!(balance, dec("-10"));
    }

    #[test]
    fn test_balance_out_of_range_rejected() {
        let err = check_movement(
            StockOwnerKind::Farmer,
            MovementReason::Harvest,
            dec("10"),
            Decimal::MAX,
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            StockError::OutOfRange {
                current: Decimal::MAX,
                change: dec("10"),
            }
        );

        // One gram past the largest storable balance
        let err = check_movement(
            StockOwnerKind::PackingStation,
            MovementReason::RawInFromFarmer,
            dec("0.001"),
            dec("99999999999.999"),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, StockError::OutOfRange { .. }));
    }

    #[test]
    fn test_quantity_precision_enforced() {
        assert!(validate_positive_quantity(dec("0.0004")).is_err());
        assert!(validate_positive_quantity(dec("1.0004")).is_err());
        assert!(validate_positive_quantity(dec("1.0000")).is_ok());
        assert!(validate_positive_quantity(dec("0.001")).is_ok());
        assert!(validate_counted_quantity(dec("12.3456")).is_err());
        assert!(validate_counted_quantity(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_quantity_magnitude_enforced() {
        assert!(validate_positive_quantity(dec("100000000000000000000")).is_err());
        assert!(validate_positive_quantity(Decimal::MAX).is_err());
        assert!(validate_positive_quantity(MAX_QUANTITY).is_err());
        assert!(validate_positive_quantity(dec("99999999999.999")).is_ok());
        assert!(validate_counted_quantity(Decimal::MAX).is_err());
    }

    #[test]
    fn test_cancellation_both_directions() {
        // Farmer gets the potatoes back, station gives them up
        assert_eq!(
            check_movement(
                StockOwnerKind::Farmer,
                MovementReason::DeliveryCancelled,
                dec("250"),
                dec("0"),
                false
            )
            .unwrap(),
            dec("250")
        );
        assert_eq!(
            check_movement(
                StockOwnerKind::PackingStation,
                MovementReason::DeliveryCancelled,
                dec("-250"),
                dec("400"),
                false
            )
            .unwrap(),
            dec("150")
        );
    }

    #[test]
    fn test_inventory_delta() {
        assert_eq!(inventory_delta(dec("100"), dec("95.5")), Some(dec("-4.5")));
        assert_eq!(inventory_delta(dec("100"), dec("120")), Some(dec("20")));
        assert_eq!(inventory_delta(dec("100"), dec("100.000")), None);
    }

    #[test]
    fn test_mismatch_detection() {
        let owner = Uuid::new_v4();
        let item = Uuid::new_v4();
        let orphan = Uuid::new_v4();

        let mut balances = BTreeMap::new();
        balances.insert((owner, item), dec("90"));
        let mut sums = BTreeMap::new();
        sums.insert((owner, item), dec("100"));
        sums.insert((owner, orphan), dec("5"));

        let mismatches = find_mismatches(&balances, &sums);
        assert_eq!(mismatches.len(), 2);
        let first = mismatches.iter().find(|m| m.item_id == item).unwrap();
        assert_eq!(first.difference, dec("-10"));
        let second = mismatches.iter().find(|m| m.item_id == orphan).unwrap();
        assert_eq!(second.balance, Decimal::ZERO);
    }

    #[test]
    fn test_units_per_ledger() {
        assert_eq!(StockOwnerKind::Farmer.unit(), "kg");
        assert_eq!(StockOwnerKind::PackingStation.unit(), "kg");
        assert_eq!(StockOwnerKind::PackingPlant.unit(), "colli");
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Accepted movements always respect the reason's sign rule
    #[test]
    fn prop_accepted_movements_respect_sign(
        owner in owner_strategy(),
        reason in reason_strategy(),
        qty in quantity_strategy(),
        negative in any::<bool>(),
    ) {
        let change = if negative { -qty } else { qty };
        if let Ok(_) = check_movement(owner, reason, change, dec("100000000"), false) {
            prop_assert!(reason.allowed_for(owner));
            match reason.sign_rule() {
                SignRule::Positive => prop_assert!(change > Decimal::ZERO),
                SignRule::Negative => prop_assert!(change < Decimal::ZERO),
                SignRule::Either => {}
            }
        }
    }

    /// Without the override no accepted movement leaves a negative balance
    #[test]
    fn prop_balance_never_negative(
        current in (0i64..1_000_000i64).prop_map(|m| Decimal::new(m, 3)),
        qty in quantity_strategy(),
    ) {
        match check_movement(StockOwnerKind::Farmer, MovementReason::Loss, -qty, current, false) {
            Ok(balance) => {
                prop_assert!(balance >= Decimal::ZERO);
                prop_assert_eq!(balance, current - qty);
            }
            Err(StockError::InsufficientStock { available, requested }) => {
                prop_assert!(qty > current);
                prop_assert_eq!(available, current);
                prop_assert_eq!(requested, qty);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    /// An inventory count followed by its delta lands exactly on the count
    #[test]
    fn prop_inventory_reaches_count(
        current in (0i64..1_000_000i64).prop_map(|m| Decimal::new(m, 3)),
        counted in (0i64..1_000_000i64).prop_map(|m| Decimal::new(m, 3)),
    ) {
        match inventory_delta(current, counted) {
            Some(delta) => {
                let balance = check_movement(
                    StockOwnerKind::PackingStation,
                    MovementReason::Inventory,
                    delta,
                    current,
                    false,
                ).unwrap();
                prop_assert_eq!(balance, counted);
            }
            None => prop_assert_eq!(current, counted),
        }
    }

    /// Balances built by applying movements equal the replayed movement sums
    #[test]
    fn prop_replay_matches_applied_balances(
        changes in prop::collection::vec((0usize..3, 1i64..100_000i64), 1..40),
    ) {
        let owner = Uuid::new_v4();
        let items = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

        let mut balances: BTreeMap<(Uuid, Uuid), Decimal> = BTreeMap::new();
        let mut log = Vec::new();
        for (idx, milli) in changes {
            let change = Decimal::new(milli, 3);
            let key = (owner, items[idx]);
            let current = balances.get(&key).copied().unwrap_or(Decimal::ZERO);
            let new_balance = check_movement(
                StockOwnerKind::Farmer,
                MovementReason::Harvest,
                change,
                current,
                false,
            ).unwrap();
            balances.insert(key, new_balance);
            log.push((owner, items[idx], change));
        }

        let replayed = replay_balances(log);
        prop_assert_eq!(&replayed, &balances);
        prop_assert!(find_mismatches(&balances, &replayed).is_empty());
    }

    /// Quantities that pass validation survive rounding to the column scale,
    /// so the persisted balance always equals the sum of persisted movements
    #[test]
    fn prop_persisted_balance_equals_replayed_sum(
        changes in prop::collection::vec((1i64..10_000_000i64, 0u32..7), 1..40),
    ) {
        let owner = Uuid::new_v4();
        let item = Uuid::new_v4();

        let mut stored_balance = Decimal::ZERO;
        let mut stored_log = Vec::new();
        for (mantissa, scale) in changes {
            let change = Decimal::new(mantissa, scale);
            if validate_positive_quantity(change).is_err() {
                prop_assert!(change.normalize().scale() > 3);
                continue;
            }
            prop_assert_eq!(change.round_dp(3), change);

            let new_balance = check_movement(
                StockOwnerKind::Farmer,
                MovementReason::Harvest,
                change,
                stored_balance,
                false,
            ).unwrap();
            // NUMERIC(14, 3) keeps three decimal places
            stored_balance = new_balance.round_dp(3);
            stored_log.push((owner, item, change.round_dp(3)));
        }

        let replayed = replay_balances(stored_log);
        let expected = replayed.get(&(owner, item)).copied().unwrap_or(Decimal::ZERO);
        prop_assert_eq!(stored_balance, expected);
    }
}
