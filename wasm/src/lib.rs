//! WebAssembly module for the Farm Cooperative Platform
//!
//! Provides client-side computation for:
//! - Packaging yield and loss
//! - Packed weight of colli
//! - Break-even price per colli
//! - Price validity windows and ISO week labels

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::debug_1(&JsValue::from_str(concat!(
        "farm-coop-wasm ",
        env!("CARGO_PKG_VERSION")
    )));
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn parse_date(value: &str) -> Result<NaiveDate, JsValue> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| JsValue::from_str(&format!("Invalid date {}: {}", value, e)))
}

/// Net weight in kg of `colli` cases
#[wasm_bindgen]
pub fn calculate_packed_weight(colli: u32, unit_weight_kg: f64, units_per_colli: i32) -> f64 {
    to_f64(packed_weight_kg(
        Decimal::from(colli),
        to_decimal(unit_weight_kg),
        units_per_colli,
    ))
}

/// Yield and loss of a packaging run as JSON
/// (`raw_input_kg`, `packed_weight_kg`, `sorting_waste_kg`, `yield_percent`, `loss_percent`)
#[wasm_bindgen]
pub fn calculate_packaging_yield_json(
    raw_input_kg: f64,
    colli: u32,
    unit_weight_kg: f64,
    units_per_colli: i32,
    sorting_waste_kg: f64,
) -> Result<String, JsValue> {
    let packed = packed_weight_kg(Decimal::from(colli), to_decimal(unit_weight_kg), units_per_colli);
    let result = calculate_packaging_yield(to_decimal(raw_input_kg), packed, to_decimal(sorting_waste_kg));
    serde_json::to_string(&result).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Yield percentage of a packaging run
#[wasm_bindgen]
pub fn calculate_yield_percent(raw_input_kg: f64, colli: u32, unit_weight_kg: f64, units_per_colli: i32) -> f64 {
    let packed = packed_weight_kg(Decimal::from(colli), to_decimal(unit_weight_kg), units_per_colli);
    to_f64(calculate_packaging_yield(to_decimal(raw_input_kg), packed, Decimal::ZERO).yield_percent)
}

/// Loss percentage of a packaging run, never below zero
#[wasm_bindgen]
pub fn calculate_loss_percent(raw_input_kg: f64, colli: u32, unit_weight_kg: f64, units_per_colli: i32) -> f64 {
    let packed = packed_weight_kg(Decimal::from(colli), to_decimal(unit_weight_kg), units_per_colli);
    to_f64(calculate_packaging_yield(to_decimal(raw_input_kg), packed, Decimal::ZERO).loss_percent)
}

/// Price per colli that covers `total_costs`; `None` when nothing was sold
#[wasm_bindgen]
pub fn calculate_break_even_price(total_costs: f64, colli_sold: u32) -> Option<f64> {
    break_even_price(to_decimal(total_costs), i64::from(colli_sold)).map(to_f64)
}

/// Whether `date` falls in the window `[valid_from, valid_to)`; an empty
/// `valid_to` leaves the window open
#[wasm_bindgen]
pub fn price_window_contains(valid_from: &str, valid_to: Option<String>, date: &str) -> Result<bool, JsValue> {
    let from = parse_date(valid_from)?;
    let to = match valid_to.as_deref() {
        Some(s) if !s.is_empty() => Some(parse_date(s)?),
        _ => None,
    };
    let date = parse_date(date)?;
    Ok(from <= date && to.map_or(true, |t| date < t))
}

/// ISO week label of a date, e.g. `2024-W07`
#[wasm_bindgen]
pub fn iso_week_label(date: &str) -> Result<String, JsValue> {
    Ok(IsoWeek::from_date(parse_date(date)?).to_string())
}

/// Form check for quantities entered in kg or colli
#[wasm_bindgen]
pub fn is_valid_quantity(quantity: f64) -> bool {
    quantity.is_finite() && validate_positive_quantity(to_decimal(quantity)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_weight() {
        // 10 colli of 8 x 2.5 kg
        assert!((calculate_packed_weight(10, 2.5, 8) - 200.0).abs() < 0.001);
    }

    #[test]
    fn test_yield_and_loss() {
        // 250 kg raw, 200 kg packed
        assert!((calculate_yield_percent(250.0, 10, 2.5, 8) - 80.0).abs() < 0.001);
        assert!((calculate_loss_percent(250.0, 10, 2.5, 8) - 20.0).abs() < 0.001);
        assert_eq!(calculate_yield_percent(0.0, 10, 2.5, 8), 0.0);
    }

    #[test]
    fn test_loss_never_negative() {
        // packed weight above raw input, e.g. after rounding of bag weights
        assert_eq!(calculate_loss_percent(190.0, 10, 2.5, 8), 0.0);
    }

    #[test]
    fn test_huge_inputs_do_not_panic() {
        assert_eq!(calculate_yield_percent(0.001, u32::MAX, 1e27, i32::MAX), 0.0);
        assert_eq!(calculate_loss_percent(0.001, u32::MAX, 1e27, i32::MAX), 0.0);
    }

    #[test]
    fn test_yield_json_has_fields() {
        let json = calculate_packaging_yield_json(250.0, 10, 2.5, 8, 12.5).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("yield_percent").is_some());
        assert!(value.get("loss_percent").is_some());
    }

    #[test]
    fn test_break_even() {
        assert_eq!(calculate_break_even_price(1000.0, 0), None);
        let price = calculate_break_even_price(1000.0, 400).unwrap();
        assert!((price - 2.5).abs() < 0.001);
    }

    #[test]
    fn test_price_window() {
        assert!(price_window_contains("2024-01-01", None, "2030-06-01").unwrap());
        assert!(price_window_contains("2024-01-01", Some("2024-02-01".into()), "2024-01-31").unwrap());
        assert!(!price_window_contains("2024-01-01", Some("2024-02-01".into()), "2024-02-01").unwrap());
        assert!(!price_window_contains("2024-01-01", Some(String::new()), "2023-12-31").unwrap());
    }

    #[test]
    fn test_iso_week_label() {
        assert_eq!(iso_week_label("2024-02-14").unwrap(), "2024-W07");
        // 2021-01-03 belongs to the last week of 2020
        assert_eq!(iso_week_label("2021-01-03").unwrap(), "2020-W53");
    }

    #[test]
    fn test_quantity_check() {
        assert!(is_valid_quantity(12.5));
        assert!(!is_valid_quantity(0.0));
        assert!(!is_valid_quantity(f64::NAN));
    }
}
