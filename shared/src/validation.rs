//! Validation utilities for the farm cooperative platform

use rust_decimal::Decimal;

use crate::types::IsoWeek;

// ============================================================================
// Quantity and Money Validations
// ============================================================================

/// Kilograms and colli are stored as NUMERIC(14, 3)
pub const QUANTITY_SCALE: u32 = 3;

/// Exclusive upper bound of a stored quantity (1e11)
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(0x4876_E800, 0x17, 0, false, 0);

/// Prices are stored as NUMERIC(12, 4)
pub const PRICE_SCALE: u32 = 4;

/// Exclusive upper bound of a stored price (1e8)
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Exclusive upper bound of a stored cost (1e10)
pub const MAX_COST: Decimal = Decimal::from_parts(0x540B_E400, 0x2, 0, false, 0);

/// Quantity fits the ledger columns without rounding
fn check_quantity_precision(quantity: Decimal) -> Result<(), &'static str> {
    if quantity.normalize().scale() > QUANTITY_SCALE {
        return Err("Quantity must have at most 3 decimal places");
    }
    if quantity.abs() >= MAX_QUANTITY {
        return Err("Quantity is too large");
    }
    Ok(())
}

/// Quantities booked through the workflows are always strictly positive;
/// the direction comes from the reason code.
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    check_quantity_precision(quantity)
}

/// Physical stock counts may be zero but never negative
pub fn validate_counted_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Counted quantity cannot be negative");
    }
    check_quantity_precision(quantity)
}

/// Prices are strictly positive and carry at most four decimal places
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::ZERO {
        return Err("Price must be positive");
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err("Price must have at most 4 decimal places");
    }
    if price >= MAX_PRICE {
        return Err("Price is too large");
    }
    Ok(())
}

/// Costs may be zero (e.g. goodwill complaints) but never negative
pub fn validate_cost(cost: Decimal) -> Result<(), &'static str> {
    if cost < Decimal::ZERO {
        return Err("Cost cannot be negative");
    }
    if cost.normalize().scale() > PRICE_SCALE {
        return Err("Cost must have at most 4 decimal places");
    }
    if cost >= MAX_COST {
        return Err("Cost is too large");
    }
    Ok(())
}

/// Sorting waste cannot exceed the raw input of a packaging run
pub fn validate_sorting_waste(raw_input_kg: Decimal, sorting_waste_kg: Decimal) -> Result<(), &'static str> {
    if sorting_waste_kg < Decimal::ZERO {
        return Err("Sorting waste cannot be negative");
    }
    if sorting_waste_kg > raw_input_kg {
        return Err("Sorting waste cannot exceed raw input");
    }
    check_quantity_precision(sorting_waste_kg)
}

// ============================================================================
// Planning Validations
// ============================================================================

/// Validate an ISO year/week pair from a delivery plan
pub fn validate_iso_week(year: i32, week: u32) -> Result<IsoWeek, &'static str> {
    if !(2000..=2100).contains(&year) {
        return Err("Plan year must be between 2000 and 2100");
    }
    IsoWeek::new(year, week).ok_or("Week does not exist in the given ISO year")
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Names of parties, varieties and products
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > 200 {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_scale_is_limited() {
        assert!(validate_price(Decimal::new(12345, 4)).is_ok());
        assert!(validate_price(Decimal::new(123456, 5)).is_err());
        assert!(validate_price(Decimal::ZERO).is_err());
    }

    #[test]
    fn quantity_bounds() {
        assert_eq!(MAX_QUANTITY, Decimal::from(100_000_000_000i64));
        assert_eq!(MAX_PRICE, Decimal::from(100_000_000));
        assert_eq!(MAX_COST, Decimal::from(10_000_000_000i64));

        assert!(validate_positive_quantity(Decimal::new(1_000, 3)).is_ok());
        // trailing zeros do not count as precision
        assert!(validate_positive_quantity(Decimal::new(15_000, 4)).is_ok());
        assert!(validate_positive_quantity(Decimal::new(10_004, 4)).is_err());
        assert!(validate_positive_quantity(Decimal::new(4, 4)).is_err());
        assert!(validate_positive_quantity(Decimal::from(100_000_000_000i64)).is_err());
        assert!(validate_positive_quantity(Decimal::MAX).is_err());
        assert!(validate_counted_quantity(Decimal::new(5, 4)).is_err());
        assert!(validate_counted_quantity(Decimal::ZERO).is_ok());
    }

    #[test]
    fn cost_bounds() {
        assert!(validate_cost(Decimal::ZERO).is_ok());
        assert!(validate_cost(Decimal::new(123_456, 5)).is_err());
        assert!(validate_cost(Decimal::from(10_000_000_000i64)).is_err());
        assert!(validate_price(Decimal::from(100_000_000)).is_err());
    }

    #[test]
    fn waste_bounded_by_input() {
        assert!(validate_sorting_waste(Decimal::from(100), Decimal::from(100)).is_ok());
        assert!(validate_sorting_waste(Decimal::from(100), Decimal::from(101)).is_err());
    }

    #[test]
    fn names_are_trimmed() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name(" Linda ").is_ok());
    }

    #[test]
    fn iso_week_validation() {
        assert!(validate_iso_week(2024, 52).is_ok());
        assert!(validate_iso_week(2024, 0).is_err());
        assert!(validate_iso_week(1999, 10).is_err());
    }
}
