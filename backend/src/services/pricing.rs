//! Pricing service: customer prices per colli and farmer prices per kg

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::catalog::fetch_product;
use crate::services::party::ensure_party;
use shared::{
    price_windows, resolve_price, validate_price, CustomerPrice, FarmerPrice, PartyKind, PricePoint,
    Quality,
};

/// Pricing service
#[derive(Clone)]
pub struct PricingService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct CustomerPriceRow {
    id: Uuid,
    customer_id: Option<Uuid>,
    product_id: Uuid,
    price_per_colli: Decimal,
    valid_from: NaiveDate,
    created_at: DateTime<Utc>,
}

impl CustomerPriceRow {
    fn point(&self) -> PricePoint {
        PricePoint {
            id: self.id,
            customer_id: self.customer_id,
            valid_from: self.valid_from,
            price: self.price_per_colli,
        }
    }
}

#[derive(Debug, FromRow)]
struct FarmerPriceRow {
    id: Uuid,
    quality: String,
    price_per_kg: Decimal,
    valid_from: NaiveDate,
    created_at: DateTime<Utc>,
}

impl FarmerPriceRow {
    fn point(&self) -> PricePoint {
        PricePoint {
            id: self.id,
            customer_id: None,
            valid_from: self.valid_from,
            price: self.price_per_kg,
        }
    }
}

/// Input for a customer price; no customer means a list price
#[derive(Debug, Deserialize)]
pub struct CreateCustomerPriceInput {
    pub customer_id: Option<Uuid>,
    pub product_id: Uuid,
    pub price_per_colli: Decimal,
    pub valid_from: NaiveDate,
}

/// Input for a farmer price
#[derive(Debug, Deserialize)]
pub struct CreateFarmerPriceInput {
    pub quality: Quality,
    pub price_per_kg: Decimal,
    pub valid_from: NaiveDate,
}

/// Filter for customer price history
#[derive(Debug, Deserialize)]
pub struct CustomerPriceQuery {
    pub product_id: Uuid,
    pub customer_id: Option<Uuid>,
}

/// Lookup of the customer price in force
#[derive(Debug, Deserialize)]
pub struct ResolveCustomerPriceQuery {
    pub product_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub date: NaiveDate,
}

/// Lookup of the farmer price in force
#[derive(Debug, Deserialize)]
pub struct ResolveFarmerPriceQuery {
    pub quality: Quality,
    pub date: NaiveDate,
}

/// A resolved price with the row it came from
#[derive(Debug, Serialize)]
pub struct ResolvedPrice {
    pub price_id: Uuid,
    pub price: Decimal,
    pub valid_from: NaiveDate,
    /// "customer" for a customer-specific row, "list" otherwise
    pub scope: &'static str,
}

impl From<PricePoint> for ResolvedPrice {
    fn from(point: PricePoint) -> Self {
        ResolvedPrice {
            price_id: point.id,
            price: point.price,
            valid_from: point.valid_from,
            scope: if point.customer_id.is_some() { "customer" } else { "list" },
        }
    }
}

/// Customer price per colli in force on `date`, customer-specific rows first
pub async fn customer_price_on<'e, E>(
    executor: E,
    customer_id: Option<Uuid>,
    product_id: Uuid,
    date: NaiveDate,
) -> AppResult<Option<PricePoint>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, CustomerPriceRow>(
        r#"
        SELECT id, customer_id, product_id, price_per_colli, valid_from, created_at
        FROM customer_prices
        WHERE product_id = $1
          AND (customer_id IS NULL OR customer_id = $2)
        ORDER BY valid_from, created_at
        "#,
    )
    .bind(product_id)
    .bind(customer_id)
    .fetch_all(executor)
    .await?;

    let points: Vec<PricePoint> = rows.iter().map(CustomerPriceRow::point).collect();
    Ok(resolve_price(&points, customer_id, date))
}

/// Farmer price per kg in force on `date` for a quality class
pub async fn farmer_price_on<'e, E>(executor: E, quality: Quality, date: NaiveDate) -> AppResult<Option<PricePoint>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, FarmerPriceRow>(
        r#"
        SELECT id, quality, price_per_kg, valid_from, created_at
        FROM farmer_prices
        WHERE quality = $1
        ORDER BY valid_from, created_at
        "#,
    )
    .bind(quality.as_str())
    .fetch_all(executor)
    .await?;

    let points: Vec<PricePoint> = rows.iter().map(FarmerPriceRow::point).collect();
    Ok(resolve_price(&points, None, date))
}

impl PricingService {
    /// Create a new PricingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Add a customer or list price row
    pub async fn create_customer_price(&self, input: CreateCustomerPriceInput) -> AppResult<CustomerPrice> {
        validate_price(input.price_per_colli).map_err(|m| AppError::invalid("price_per_colli", m))?;
        fetch_product(&self.db, input.product_id).await?;
        if let Some(customer_id) = input.customer_id {
            ensure_party(&self.db, customer_id, PartyKind::Customer).await?;
        }

        let row = sqlx::query_as::<_, CustomerPriceRow>(
            r#"
            INSERT INTO customer_prices (customer_id, product_id, price_per_colli, valid_from)
            VALUES ($1, $2, $3, $4)
            RETURNING id, customer_id, product_id, price_per_colli, valid_from, created_at
            "#,
        )
        .bind(input.customer_id)
        .bind(input.product_id)
        .bind(input.price_per_colli)
        .bind(input.valid_from)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            price_id = %row.id,
            product_id = %row.product_id,
            customer_id = ?row.customer_id,
            valid_from = %row.valid_from,
            "Customer price added"
        );

        // The new row may close the window of an older one; report it within its history
        let history = self
            .customer_price_history(CustomerPriceQuery {
                product_id: input.product_id,
                customer_id: input.customer_id,
            })
            .await?;
        history
            .into_iter()
            .find(|p| p.id == row.id)
            .ok_or_else(|| AppError::Internal("Created price missing from history".to_string()))
    }

    /// Price history of a product with computed validity ends.
    ///
    /// With a customer given, only that customer's rows are listed; otherwise
    /// only list prices.
    pub async fn customer_price_history(&self, query: CustomerPriceQuery) -> AppResult<Vec<CustomerPrice>> {
        let rows = sqlx::query_as::<_, CustomerPriceRow>(
            r#"
            SELECT id, customer_id, product_id, price_per_colli, valid_from, created_at
            FROM customer_prices
            WHERE product_id = $1
              AND customer_id IS NOT DISTINCT FROM $2
            ORDER BY valid_from, created_at
            "#,
        )
        .bind(query.product_id)
        .bind(query.customer_id)
        .fetch_all(&self.db)
        .await?;

        let points: Vec<PricePoint> = rows.iter().map(CustomerPriceRow::point).collect();
        let windows = price_windows(&points);

        Ok(windows
            .into_iter()
            .filter_map(|w| {
                rows.iter().find(|r| r.id == w.point.id).map(|r| CustomerPrice {
                    id: r.id,
                    customer_id: r.customer_id,
                    product_id: r.product_id,
                    price_per_colli: r.price_per_colli,
                    valid_from: r.valid_from,
                    valid_to: w.valid_to,
                    created_at: r.created_at,
                })
            })
            .collect())
    }

    /// Resolve the customer price in force on a date
    pub async fn resolve_customer_price(&self, query: ResolveCustomerPriceQuery) -> AppResult<ResolvedPrice> {
        customer_price_on(&self.db, query.customer_id, query.product_id, query.date)
            .await?
            .map(ResolvedPrice::from)
            .ok_or_else(|| {
                AppError::PriceNotFound(format!("no customer price for product on {}", query.date))
            })
    }

    /// Add a farmer price row
    pub async fn create_farmer_price(&self, input: CreateFarmerPriceInput) -> AppResult<FarmerPrice> {
        validate_price(input.price_per_kg).map_err(|m| AppError::invalid("price_per_kg", m))?;

        let row = sqlx::query_as::<_, FarmerPriceRow>(
            r#"
            INSERT INTO farmer_prices (quality, price_per_kg, valid_from)
            VALUES ($1, $2, $3)
            RETURNING id, quality, price_per_kg, valid_from, created_at
            "#,
        )
        .bind(input.quality.as_str())
        .bind(input.price_per_kg)
        .bind(input.valid_from)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            price_id = %row.id,
            quality = %row.quality,
            valid_from = %row.valid_from,
            "Farmer price added"
        );

        self.farmer_price_history(Some(input.quality))
            .await?
            .into_iter()
            .find(|p| p.id == row.id)
            .ok_or_else(|| AppError::Internal("Created price missing from history".to_string()))
    }

    /// Farmer price history, per quality, with computed validity ends
    pub async fn farmer_price_history(&self, quality: Option<Quality>) -> AppResult<Vec<FarmerPrice>> {
        let rows = sqlx::query_as::<_, FarmerPriceRow>(
            r#"
            SELECT id, quality, price_per_kg, valid_from, created_at
            FROM farmer_prices
            WHERE ($1::varchar IS NULL OR quality = $1)
            ORDER BY quality, valid_from, created_at
            "#,
        )
        .bind(quality.map(|q| q.as_str()))
        .fetch_all(&self.db)
        .await?;

        let mut prices = Vec::with_capacity(rows.len());
        for q in Quality::ALL {
            let scoped: Vec<&FarmerPriceRow> = rows.iter().filter(|r| r.quality == q.as_str()).collect();
            let points: Vec<PricePoint> = scoped.iter().map(|r| r.point()).collect();
            for window in price_windows(&points) {
                if let Some(row) = scoped.iter().find(|r| r.id == window.point.id) {
                    prices.push(FarmerPrice {
                        id: row.id,
                        quality: q,
                        price_per_kg: row.price_per_kg,
                        valid_from: row.valid_from,
                        valid_to: window.valid_to,
                        created_at: row.created_at,
                    });
                }
            }
        }
        Ok(prices)
    }

    /// Resolve the farmer price in force on a date
    pub async fn resolve_farmer_price(&self, query: ResolveFarmerPriceQuery) -> AppResult<ResolvedPrice> {
        farmer_price_on(&self.db, query.quality, query.date)
            .await?
            .map(ResolvedPrice::from)
            .ok_or_else(|| {
                AppError::PriceNotFound(format!(
                    "no farmer price for {} on {}",
                    query.quality.as_str(),
                    query.date
                ))
            })
    }
}
