//! Pricing tests
//!
//! Tests for price validity windows and price resolution:
//! - A row is valid from its date until the next row of the same scope
//! - Customer prices beat list prices
//! - Later rows supersede earlier rows starting the same day

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{price_windows, resolve_price, PricePoint, Quality};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn point(customer_id: Option<Uuid>, valid_from: &str, price: &str) -> PricePoint {
    PricePoint {
        id: Uuid::new_v4(),
        customer_id,
        valid_from: date(valid_from),
        price: dec(price),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_quality_codes() {
        for quality in Quality::ALL {
            assert_eq!(Quality::from_str(quality.as_str()).unwrap(), quality);
        }
        assert!(Quality::from_str("CLASS_THREE").is_err());
    }

    #[test]
    fn test_windows_close_at_next_row() {
        let points = vec![
            point(None, "2024-03-01", "12.00"),
            point(None, "2024-01-01", "10.00"),
            point(None, "2024-06-01", "13.50"),
        ];

        let windows = price_windows(&points);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].point.price, dec("10.00"));
        assert_eq!(windows[0].valid_to, Some(date("2024-03-01")));
        assert_eq!(windows[1].valid_to, Some(date("2024-06-01")));
        assert_eq!(windows[2].valid_to, None);
    }

    #[test]
    fn test_scopes_have_separate_windows() {
        let customer = Uuid::new_v4();
        let points = vec![
            point(None, "2024-01-01", "10.00"),
            point(Some(customer), "2024-02-01", "9.00"),
            point(None, "2024-04-01", "11.00"),
        ];

        let windows = price_windows(&points);
        let customer_window = windows
            .iter()
            .find(|w| w.point.customer_id == Some(customer))
            .unwrap();
        // A list price change does not end the customer price
        assert_eq!(customer_window.valid_to, None);
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let points = vec![
            point(None, "2024-01-01", "10.00"),
            point(None, "2024-02-01", "12.00"),
        ];

        assert_eq!(
            resolve_price(&points, None, date("2024-01-31")).unwrap().price,
            dec("10.00")
        );
        assert_eq!(
            resolve_price(&points, None, date("2024-02-01")).unwrap().price,
            dec("12.00")
        );
    }

    #[test]
    fn test_nothing_before_first_row() {
        let points = vec![point(None, "2024-01-01", "10.00")];
        assert!(resolve_price(&points, None, date("2023-12-31")).is_none());
        assert!(resolve_price(&[], None, date("2024-01-01")).is_none());
    }

    #[test]
    fn test_customer_price_wins() {
        let customer = Uuid::new_v4();
        let points = vec![
            point(None, "2024-03-01", "10.00"),
            point(Some(customer), "2024-01-01", "9.50"),
        ];

        let resolved = resolve_price(&points, Some(customer), date("2024-04-01")).unwrap();
        assert_eq!(resolved.price, dec("9.50"));
        assert_eq!(resolved.customer_id, Some(customer));
    }

    #[test]
    fn test_other_customers_get_list_price() {
        let customer = Uuid::new_v4();
        let other = Uuid::new_v4();
        let points = vec![
            point(None, "2024-01-01", "10.00"),
            point(Some(customer), "2024-01-01", "9.50"),
        ];

        let resolved = resolve_price(&points, Some(other), date("2024-02-01")).unwrap();
        assert_eq!(resolved.price, dec("10.00"));
        assert!(resolve_price(&points[1..], Some(other), date("2024-02-01")).is_none());
    }

    #[test]
    fn test_same_day_later_row_wins() {
        let points = vec![
            point(None, "2024-01-01", "10.00"),
            point(None, "2024-01-01", "10.40"),
        ];

        let resolved = resolve_price(&points, None, date("2024-01-15")).unwrap();
        assert_eq!(resolved.price, dec("10.40"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every date from the first row on resolves to exactly the row whose
    /// window contains it
    #[test]
    fn prop_one_window_per_date(
        offsets in prop::collection::btree_set(0i64..365, 1..12),
        day_offset in 0i64..400,
    ) {
        let start = date("2024-01-01");
        let points: Vec<PricePoint> = offsets
            .iter()
            .map(|&o| PricePoint {
                id: Uuid::new_v4(),
                customer_id: None,
                valid_from: start + Duration::days(o),
                price: Decimal::from(o + 1),
            })
            .collect();

        let day = start + Duration::days(day_offset);
        let windows = price_windows(&points);
        let containing: Vec<_> = windows.iter().filter(|w| w.contains(day)).collect();

        let first = *offsets.iter().next().unwrap();
        if day_offset < first {
            prop_assert!(containing.is_empty());
            prop_assert!(resolve_price(&points, None, day).is_none());
        } else {
            prop_assert_eq!(containing.len(), 1);
            let expected = offsets.iter().filter(|&&o| o <= day_offset).max().copied().unwrap();
            let resolved = resolve_price(&points, None, day).unwrap();
            prop_assert_eq!(resolved.price, Decimal::from(expected + 1));
        }
    }

    /// A valid customer row always wins over the list price
    #[test]
    fn prop_customer_row_beats_list(
        list_offset in 0i64..100,
        customer_offset in 0i64..100,
        day_offset in 100i64..200,
    ) {
        let start = date("2024-01-01");
        let customer = Uuid::new_v4();
        let points = vec![
            PricePoint {
                id: Uuid::new_v4(),
                customer_id: None,
                valid_from: start + Duration::days(list_offset),
                price: dec("10"),
            },
            PricePoint {
                id: Uuid::new_v4(),
                customer_id: Some(customer),
                valid_from: start + Duration::days(customer_offset),
                price: dec("8"),
            },
        ];

        let day = start + Duration::days(day_offset);
        prop_assert_eq!(resolve_price(&points, Some(customer), day).unwrap().price, dec("8"));
        prop_assert_eq!(resolve_price(&points, None, day).unwrap().price, dec("10"));
    }
}
