//! Delivery service: farmer deliveries to packing stations, direct sales and
//! weekly delivery plans

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::catalog::fetch_variety;
use crate::services::party::ensure_party;
use crate::services::pricing::farmer_price_on;
use crate::services::stock::{NewMovement, StockLedgerService};
use shared::{
    check_cancellable, validate_counted_quantity, validate_iso_week, validate_positive_quantity,
    validate_price, Delivery, DeliveryPlan, DeliveryStatus, DirectSale, MovementReason,
    MovementReference, PartyKind, Quality, StockOwnerKind,
};

/// Direction of a farm-to-station transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Deliver,
    Cancel,
}

/// Ledger movements of a delivery or its cancellation. The farmer leg always
/// comes first so concurrent creates and cancels lock rows in the same order.
fn transfer_movements(
    delivery_id: Uuid,
    farmer_id: Uuid,
    station_id: Uuid,
    variety_id: Uuid,
    quantity_kg: Decimal,
    transfer: Transfer,
) -> [NewMovement; 2] {
    let (farmer_change, farmer_reason, station_reason) = match transfer {
        Transfer::Deliver => (
            -quantity_kg,
            MovementReason::DeliveryToPacker,
            MovementReason::RawInFromFarmer,
        ),
        Transfer::Cancel => (
            quantity_kg,
            MovementReason::DeliveryCancelled,
            MovementReason::DeliveryCancelled,
        ),
    };
    let reference = Some(MovementReference::delivery(delivery_id));
    [
        NewMovement {
            owner_kind: StockOwnerKind::Farmer,
            owner_id: farmer_id,
            item_id: variety_id,
            change_amount: farmer_change,
            reason: farmer_reason,
            reference,
            notes: None,
        },
        NewMovement {
            owner_kind: StockOwnerKind::PackingStation,
            owner_id: station_id,
            item_id: variety_id,
            change_amount: -farmer_change,
            reason: station_reason,
            reference,
            notes: None,
        },
    ]
}

/// Delivery service
#[derive(Clone)]
pub struct DeliveryService {
    db: PgPool,
    ledger: StockLedgerService,
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    id: Uuid,
    farmer_id: Uuid,
    station_id: Uuid,
    variety_id: Uuid,
    quantity_kg: Decimal,
    quality: String,
    delivery_date: NaiveDate,
    price_per_kg: Option<Decimal>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DeliveryRow> for Delivery {
    type Error = AppError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        Ok(Delivery {
            id: row.id,
            farmer_id: row.farmer_id,
            station_id: row.station_id,
            variety_id: row.variety_id,
            quantity_kg: row.quantity_kg,
            quality: row.quality.parse()?,
            delivery_date: row.delivery_date,
            price_per_kg: row.price_per_kg,
            status: row.status.parse()?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DirectSaleRow {
    id: Uuid,
    farmer_id: Uuid,
    variety_id: Uuid,
    quantity_kg: Decimal,
    price_per_kg: Option<Decimal>,
    buyer: Option<String>,
    sale_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<DirectSaleRow> for DirectSale {
    fn from(row: DirectSaleRow) -> Self {
        DirectSale {
            id: row.id,
            farmer_id: row.farmer_id,
            variety_id: row.variety_id,
            quantity_kg: row.quantity_kg,
            price_per_kg: row.price_per_kg,
            buyer: row.buyer,
            sale_date: row.sale_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DeliveryPlanRow {
    id: Uuid,
    farmer_id: Uuid,
    variety_id: Uuid,
    iso_year: i32,
    iso_week: i32,
    planned_kg: Decimal,
    created_at: DateTime<Utc>,
}

impl From<DeliveryPlanRow> for DeliveryPlan {
    fn from(row: DeliveryPlanRow) -> Self {
        DeliveryPlan {
            id: row.id,
            farmer_id: row.farmer_id,
            variety_id: row.variety_id,
            iso_year: row.iso_year,
            iso_week: row.iso_week.max(0) as u32,
            planned_kg: row.planned_kg,
            created_at: row.created_at,
        }
    }
}

/// Input for recording a delivery
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDeliveryInput {
    pub farmer_id: Uuid,
    pub station_id: Uuid,
    pub variety_id: Uuid,
    pub quantity_kg: Decimal,
    pub quality: Quality,
    pub delivery_date: NaiveDate,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Filters for delivery listings
#[derive(Debug, Deserialize, Default)]
pub struct DeliveryFilter {
    pub farmer_id: Option<Uuid>,
    pub station_id: Option<Uuid>,
    pub status: Option<DeliveryStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Input for a farmer's direct sale
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDirectSaleInput {
    pub farmer_id: Uuid,
    pub variety_id: Uuid,
    pub quantity_kg: Decimal,
    pub price_per_kg: Option<Decimal>,
    #[validate(length(max = 200))]
    pub buyer: Option<String>,
    pub sale_date: NaiveDate,
}

/// Input for a weekly delivery plan; an existing plan for the same week is replaced
#[derive(Debug, Deserialize)]
pub struct CreateDeliveryPlanInput {
    pub farmer_id: Uuid,
    pub variety_id: Uuid,
    pub iso_year: i32,
    pub iso_week: u32,
    pub planned_kg: Decimal,
}

/// Filters for delivery plan listings
#[derive(Debug, Deserialize, Default)]
pub struct DeliveryPlanFilter {
    pub farmer_id: Option<Uuid>,
    pub iso_year: Option<i32>,
}

const DELIVERY_COLUMNS: &str = "id, farmer_id, station_id, variety_id, quantity_kg, quality, \
     delivery_date, price_per_kg, status, notes, created_at";

impl DeliveryService {
    /// Create a new DeliveryService instance
    pub fn new(db: PgPool, allow_negative: bool) -> Self {
        let ledger = StockLedgerService::new(db.clone(), allow_negative);
        Self { db, ledger }
    }

    /// Record a delivery and move the potatoes from the farm to the station
    pub async fn create_delivery(&self, input: CreateDeliveryInput) -> AppResult<Delivery> {
        input.validate()?;
        validate_positive_quantity(input.quantity_kg).map_err(|m| AppError::invalid("quantity_kg", m))?;

        ensure_party(&self.db, input.farmer_id, PartyKind::Farmer).await?;
        ensure_party(&self.db, input.station_id, PartyKind::PackingStation).await?;
        fetch_variety(&self.db, input.variety_id).await?;

        let price = farmer_price_on(&self.db, input.quality, input.delivery_date).await?;
        if price.is_none() {
            tracing::warn!(
                quality = input.quality.as_str(),
                date = %input.delivery_date,
                "No farmer price in force; delivery recorded without price"
            );
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, DeliveryRow>(&format!(
            r#"
            INSERT INTO deliveries (farmer_id, station_id, variety_id, quantity_kg, quality, delivery_date, price_per_kg, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            DELIVERY_COLUMNS
        ))
        .bind(input.farmer_id)
        .bind(input.station_id)
        .bind(input.variety_id)
        .bind(input.quantity_kg)
        .bind(input.quality.as_str())
        .bind(input.delivery_date)
        .bind(price.map(|p| p.price))
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        for movement in transfer_movements(
            row.id,
            input.farmer_id,
            input.station_id,
            input.variety_id,
            input.quantity_kg,
            Transfer::Deliver,
        ) {
            self.ledger.apply(&mut tx, movement).await?;
        }

        tx.commit().await?;

        tracing::info!(
            delivery_id = %row.id,
            farmer_id = %input.farmer_id,
            station_id = %input.station_id,
            quantity_kg = %input.quantity_kg,
            "Delivery recorded"
        );

        row.try_into()
    }

    /// Cancel a delivery and book the potatoes back to the farm
    pub async fn cancel_delivery(&self, id: Uuid) -> AppResult<Delivery> {
        let mut tx = self.db.begin().await?;

        let current: Delivery = sqlx::query_as::<_, DeliveryRow>(&format!(
            "SELECT {} FROM deliveries WHERE id = $1 FOR UPDATE",
            DELIVERY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery".to_string()))?
        .try_into()?;

        check_cancellable(current.status)?;

        let row = sqlx::query_as::<_, DeliveryRow>(&format!(
            "UPDATE deliveries SET status = $2 WHERE id = $1 RETURNING {}",
            DELIVERY_COLUMNS
        ))
        .bind(id)
        .bind(DeliveryStatus::Cancelled.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for movement in transfer_movements(
            id,
            current.farmer_id,
            current.station_id,
            current.variety_id,
            current.quantity_kg,
            Transfer::Cancel,
        ) {
            self.ledger.apply(&mut tx, movement).await?;
        }

        tx.commit().await?;

        tracing::info!(delivery_id = %id, "Delivery cancelled");
        row.try_into()
    }

    /// List deliveries, newest first
    pub async fn list_deliveries(&self, filter: DeliveryFilter) -> AppResult<Vec<Delivery>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(&format!(
            r#"
            SELECT {}
            FROM deliveries
            WHERE ($1::uuid IS NULL OR farmer_id = $1)
              AND ($2::uuid IS NULL OR station_id = $2)
              AND ($3::varchar IS NULL OR status = $3)
              AND ($4::date IS NULL OR delivery_date >= $4)
              AND ($5::date IS NULL OR delivery_date <= $5)
            ORDER BY delivery_date DESC, created_at DESC
            "#,
            DELIVERY_COLUMNS
        ))
        .bind(filter.farmer_id)
        .bind(filter.station_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Delivery::try_from).collect()
    }

    /// Get a delivery by ID
    pub async fn get_delivery(&self, id: Uuid) -> AppResult<Delivery> {
        sqlx::query_as::<_, DeliveryRow>(&format!(
            "SELECT {} FROM deliveries WHERE id = $1",
            DELIVERY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery".to_string()))?
        .try_into()
    }

    /// Record potatoes a farmer sold outside the cooperative
    pub async fn record_direct_sale(&self, input: CreateDirectSaleInput) -> AppResult<DirectSale> {
        input.validate()?;
        validate_positive_quantity(input.quantity_kg).map_err(|m| AppError::invalid("quantity_kg", m))?;
        if let Some(price) = input.price_per_kg {
            validate_price(price).map_err(|m| AppError::invalid("price_per_kg", m))?;
        }

        ensure_party(&self.db, input.farmer_id, PartyKind::Farmer).await?;
        fetch_variety(&self.db, input.variety_id).await?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, DirectSaleRow>(
            r#"
            INSERT INTO direct_sales (farmer_id, variety_id, quantity_kg, price_per_kg, buyer, sale_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, farmer_id, variety_id, quantity_kg, price_per_kg, buyer, sale_date, created_at
            "#,
        )
        .bind(input.farmer_id)
        .bind(input.variety_id)
        .bind(input.quantity_kg)
        .bind(input.price_per_kg)
        .bind(&input.buyer)
        .bind(input.sale_date)
        .fetch_one(&mut *tx)
        .await?;

        self.ledger
            .apply(
                &mut tx,
                NewMovement {
                    owner_kind: StockOwnerKind::Farmer,
                    owner_id: input.farmer_id,
                    item_id: input.variety_id,
                    change_amount: -input.quantity_kg,
                    reason: MovementReason::DirectSale,
                    reference: Some(MovementReference::direct_sale(row.id)),
                    notes: input.buyer.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// List direct sales, optionally of one farmer
    pub async fn list_direct_sales(&self, farmer_id: Option<Uuid>) -> AppResult<Vec<DirectSale>> {
        let rows = sqlx::query_as::<_, DirectSaleRow>(
            r#"
            SELECT id, farmer_id, variety_id, quantity_kg, price_per_kg, buyer, sale_date, created_at
            FROM direct_sales
            WHERE ($1::uuid IS NULL OR farmer_id = $1)
            ORDER BY sale_date DESC, created_at DESC
            "#,
        )
        .bind(farmer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DirectSale::from).collect())
    }

    /// Create or replace a farmer's plan for one ISO week
    pub async fn upsert_delivery_plan(&self, input: CreateDeliveryPlanInput) -> AppResult<DeliveryPlan> {
        let week = validate_iso_week(input.iso_year, input.iso_week)
            .map_err(|m| AppError::invalid("iso_week", m))?;
        validate_counted_quantity(input.planned_kg).map_err(|m| AppError::invalid("planned_kg", m))?;

        ensure_party(&self.db, input.farmer_id, PartyKind::Farmer).await?;
        fetch_variety(&self.db, input.variety_id).await?;

        let row = sqlx::query_as::<_, DeliveryPlanRow>(
            r#"
            INSERT INTO delivery_plans (farmer_id, variety_id, iso_year, iso_week, planned_kg)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (farmer_id, variety_id, iso_year, iso_week)
            DO UPDATE SET planned_kg = EXCLUDED.planned_kg
            RETURNING id, farmer_id, variety_id, iso_year, iso_week, planned_kg, created_at
            "#,
        )
        .bind(input.farmer_id)
        .bind(input.variety_id)
        .bind(week.year)
        .bind(week.week as i32)
        .bind(input.planned_kg)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(farmer_id = %input.farmer_id, week = %week, planned_kg = %input.planned_kg, "Delivery plan saved");
        Ok(row.into())
    }

    /// List delivery plans
    pub async fn list_delivery_plans(&self, filter: DeliveryPlanFilter) -> AppResult<Vec<DeliveryPlan>> {
        let rows = sqlx::query_as::<_, DeliveryPlanRow>(
            r#"
            SELECT id, farmer_id, variety_id, iso_year, iso_week, planned_kg, created_at
            FROM delivery_plans
            WHERE ($1::uuid IS NULL OR farmer_id = $1)
              AND ($2::integer IS NULL OR iso_year = $2)
            ORDER BY iso_year, iso_week, farmer_id
            "#,
        )
        .bind(filter.farmer_id)
        .bind(filter.iso_year)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DeliveryPlan::from).collect())
    }
}
