//! Time-sliced prices
//!
//! A price row is valid from its `valid_from` date until the `valid_from` of
//! the next row in the same scope. Customer prices are scoped by customer, with
//! `customer_id = None` acting as the list price; farmer prices are scoped by
//! quality and have no customer.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// Quality class of delivered raw potatoes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quality {
    ClassOne,
    ClassTwo,
    Processing,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::ClassOne, Quality::ClassTwo, Quality::Processing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::ClassOne => "CLASS_ONE",
            Quality::ClassTwo => "CLASS_TWO",
            Quality::Processing => "PROCESSING",
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLASS_ONE" => Ok(Quality::ClassOne),
            "CLASS_TWO" => Ok(Quality::ClassTwo),
            "PROCESSING" => Ok(Quality::Processing),
            other => Err(UnknownVariant::new("quality", other)),
        }
    }
}

/// One price row as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePoint {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub valid_from: NaiveDate,
    pub price: Decimal,
}

/// A price row together with the end of its validity window (exclusive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceWindow {
    pub point: PricePoint,
    pub valid_to: Option<NaiveDate>,
}

impl PriceWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.point.valid_from <= date && self.valid_to.map_or(true, |to| date < to)
    }
}

/// Compute validity windows. Rows are grouped by scope and ordered by
/// `valid_from`; rows with the same `valid_from` keep their input order, so
/// the later one supersedes the earlier.
pub fn price_windows(points: &[PricePoint]) -> Vec<PriceWindow> {
    let mut sorted: Vec<&PricePoint> = points.iter().collect();
    sorted.sort_by_key(|p| (p.customer_id, p.valid_from));

    sorted
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let valid_to = sorted
                .get(i + 1)
                .filter(|next| next.customer_id == point.customer_id)
                .map(|next| next.valid_from);
            PriceWindow {
                point: (*point).clone(),
                valid_to,
            }
        })
        .collect()
}

/// Pick the price in force on `date`.
///
/// A row scoped to `customer_id` beats an unscoped list price; within the same
/// specificity the latest `valid_from` wins.
pub fn resolve_price(
    points: &[PricePoint],
    customer_id: Option<Uuid>,
    date: NaiveDate,
) -> Option<PricePoint> {
    price_windows(points)
        .into_iter()
        .filter(|w| w.contains(date))
        .filter(|w| w.point.customer_id.is_none() || w.point.customer_id == customer_id)
        .max_by_key(|w| (w.point.customer_id.is_some(), w.point.valid_from))
        .map(|w| w.point)
}

/// A customer or list price per colli for a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPrice {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub product_id: Uuid,
    pub price_per_colli: Decimal,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// The price per kg paid to farmers for a quality class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmerPrice {
    pub id: Uuid,
    pub quality: Quality,
    pub price_per_kg: Decimal,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(customer: Option<Uuid>, from: (i32, u32, u32), price: i64) -> PricePoint {
        PricePoint {
            id: Uuid::new_v4(),
            customer_id: customer,
            valid_from: NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
            price: Decimal::from(price),
        }
    }

    #[test]
    fn windows_end_at_next_row_in_same_scope() {
        let customer = Uuid::new_v4();
        let points = vec![
            point(None, (2024, 1, 1), 10),
            point(Some(customer), (2024, 2, 1), 9),
            point(None, (2024, 3, 1), 11),
        ];

        let windows = price_windows(&points);
        let list: Vec<_> = windows.iter().filter(|w| w.point.customer_id.is_none()).collect();
        assert_eq!(list[0].valid_to, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(list[1].valid_to, None);

        let own = windows.iter().find(|w| w.point.customer_id.is_some()).unwrap();
        assert_eq!(own.valid_to, None);
    }
}
