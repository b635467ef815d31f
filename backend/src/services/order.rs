//! Order service: customer orders and the packaging runs that fill them

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::catalog::{fetch_product, fetch_variety};
use crate::services::party::ensure_party;
use crate::services::stock::{NewMovement, StockLedgerService};
use shared::{
    calculate_packaging_yield, check_run_variety, line_amount, order_status_after_packaging,
    packed_weight_kg, validate_positive_quantity, validate_sorting_waste, MovementReason,
    MovementReference, Order, OrderStatus, PackagingRun, PackagingYield, PartyKind, StockOwnerKind,
};

/// Order and packaging service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    ledger: StockLedgerService,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    product_id: Uuid,
    quantity_colli: i32,
    delivery_date: NaiveDate,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            customer_id: row.customer_id,
            product_id: row.product_id,
            quantity_colli: row.quantity_colli,
            delivery_date: row.delivery_date,
            status: row.status.parse()?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PackagingRunRow {
    id: Uuid,
    order_id: Option<Uuid>,
    station_id: Uuid,
    plant_id: Uuid,
    variety_id: Uuid,
    product_id: Uuid,
    raw_input_kg: Decimal,
    colli_packed: i32,
    sorting_waste_kg: Decimal,
    packing_cost: Decimal,
    run_date: NaiveDate,
    created_at: DateTime<Utc>,
    unit_weight_kg: Decimal,
    units_per_colli: i32,
}

impl From<PackagingRunRow> for PackagingRunWithYield {
    fn from(row: PackagingRunRow) -> Self {
        let packed = packed_weight_kg(Decimal::from(row.colli_packed), row.unit_weight_kg, row.units_per_colli);
        let packaging_yield = calculate_packaging_yield(row.raw_input_kg, packed, row.sorting_waste_kg);
        PackagingRunWithYield {
            run: PackagingRun {
                id: row.id,
                order_id: row.order_id,
                station_id: row.station_id,
                plant_id: row.plant_id,
                variety_id: row.variety_id,
                product_id: row.product_id,
                raw_input_kg: row.raw_input_kg,
                colli_packed: row.colli_packed,
                sorting_waste_kg: row.sorting_waste_kg,
                packing_cost: row.packing_cost,
                run_date: row.run_date,
                created_at: row.created_at,
            },
            packaging_yield,
        }
    }
}

/// A packaging run together with its yield figures
#[derive(Debug, Clone, Serialize)]
pub struct PackagingRunWithYield {
    #[serde(flatten)]
    pub run: PackagingRun,
    #[serde(rename = "yield")]
    pub packaging_yield: PackagingYield,
}

/// Input for creating an order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub customer_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity_colli: i32,
    pub delivery_date: NaiveDate,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Input for advancing an order
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusInput {
    pub status: OrderStatus,
}

/// Filters for order listings
#[derive(Debug, Deserialize, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
}

/// Input for recording a packaging run
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePackagingRunInput {
    pub order_id: Option<Uuid>,
    pub station_id: Uuid,
    pub plant_id: Uuid,
    pub variety_id: Uuid,
    pub product_id: Uuid,
    pub raw_input_kg: Decimal,
    #[validate(range(min = 1))]
    pub colli_packed: i32,
    #[serde(default)]
    pub sorting_waste_kg: Decimal,
    pub run_date: NaiveDate,
}

/// Filters for packaging run listings
#[derive(Debug, Deserialize, Default)]
pub struct PackagingRunFilter {
    pub order_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

const ORDER_COLUMNS: &str =
    "id, customer_id, product_id, quantity_colli, delivery_date, status, notes, created_at, updated_at";

const RUN_SELECT: &str = r#"
    SELECT r.id, r.order_id, r.station_id, r.plant_id, r.variety_id, r.product_id,
           r.raw_input_kg, r.colli_packed, r.sorting_waste_kg, r.packing_cost, r.run_date,
           r.created_at, p.unit_weight_kg, p.units_per_colli
    FROM packaging_runs r
    JOIN products p ON p.id = r.product_id
"#;

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool, allow_negative: bool) -> Self {
        let ledger = StockLedgerService::new(db.clone(), allow_negative);
        Self { db, ledger }
    }

    /// Create an order in status OPEN
    pub async fn create_order(&self, input: CreateOrderInput) -> AppResult<Order> {
        input.validate()?;
        ensure_party(&self.db, input.customer_id, PartyKind::Customer).await?;
        fetch_product(&self.db, input.product_id).await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (customer_id, product_id, quantity_colli, delivery_date, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(input.customer_id)
        .bind(input.product_id)
        .bind(input.quantity_colli)
        .bind(input.delivery_date)
        .bind(OrderStatus::Open.as_str())
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(order_id = %row.id, customer_id = %input.customer_id, "Order created");
        row.try_into()
    }

    /// List orders by delivery date
    pub async fn list_orders(&self, filter: OrderFilter) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR customer_id = $2)
            ORDER BY delivery_date, created_at
            "#,
            ORDER_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.customer_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Get an order by ID
    pub async fn get_order(&self, id: Uuid) -> AppResult<Order> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?
            .try_into()
    }

    /// Advance an order by one step
    pub async fn update_status(&self, id: Uuid, input: UpdateOrderStatusInput) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;

        let current: Order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?
        .try_into()?;

        let next = current.status.transition_to(input.status)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, from = %current.status, to = %next, "Order status changed");
        row.try_into()
    }

    /// Record a packaging run: raw kilograms leave the station, colli enter the plant
    pub async fn create_packaging_run(&self, input: CreatePackagingRunInput) -> AppResult<PackagingRunWithYield> {
        input.validate()?;
        validate_positive_quantity(input.raw_input_kg).map_err(|m| AppError::invalid("raw_input_kg", m))?;
        validate_sorting_waste(input.raw_input_kg, input.sorting_waste_kg)
            .map_err(|m| AppError::invalid("sorting_waste_kg", m))?;

        ensure_party(&self.db, input.station_id, PartyKind::PackingStation).await?;
        ensure_party(&self.db, input.plant_id, PartyKind::PackingPlant).await?;
        fetch_variety(&self.db, input.variety_id).await?;
        let product = fetch_product(&self.db, input.product_id).await?;

        check_run_variety(product.variety_id, input.variety_id)?;
        let packing_cost = line_amount(input.colli_packed, product.packing_cost_per_colli)?;

        let mut tx = self.db.begin().await?;

        if let Some(order_id) = input.order_id {
            let order: Order = sqlx::query_as::<_, OrderRow>(&format!(
                "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
                ORDER_COLUMNS
            ))
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?
            .try_into()?;

            let advanced = order_status_after_packaging(order.status, order.product_id, input.product_id)?;
            if let Some(status) = advanced {
                sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
                    .bind(order_id)
                    .bind(status.as_str())
                    .execute(&mut *tx)
                    .await?;
                tracing::info!(order_id = %order_id, to = %status, "Order started by packaging run");
            }
        }

        let run_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO packaging_runs (order_id, station_id, plant_id, variety_id, product_id,
                                        raw_input_kg, colli_packed, sorting_waste_kg, packing_cost, run_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(input.order_id)
        .bind(input.station_id)
        .bind(input.plant_id)
        .bind(input.variety_id)
        .bind(input.product_id)
        .bind(input.raw_input_kg)
        .bind(input.colli_packed)
        .bind(input.sorting_waste_kg)
        .bind(packing_cost)
        .bind(input.run_date)
        .fetch_one(&mut *tx)
        .await?;

        let reference = Some(MovementReference::packaging_run(run_id));
        self.ledger
            .apply(
                &mut tx,
                NewMovement {
                    owner_kind: StockOwnerKind::PackingStation,
                    owner_id: input.station_id,
                    item_id: input.variety_id,
                    change_amount: -input.raw_input_kg,
                    reason: MovementReason::RawOutToPackaging,
                    reference,
                    notes: None,
                },
            )
            .await?;
        self.ledger
            .apply(
                &mut tx,
                NewMovement {
                    owner_kind: StockOwnerKind::PackingPlant,
                    owner_id: input.plant_id,
                    item_id: input.product_id,
                    change_amount: Decimal::from(input.colli_packed),
                    reason: MovementReason::PackagedIn,
                    reference,
                    notes: None,
                },
            )
            .await?;

        let row = sqlx::query_as::<_, PackagingRunRow>(&format!("{} WHERE r.id = $1", RUN_SELECT))
            .bind(run_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let run = PackagingRunWithYield::from(row);
        tracing::info!(
            run_id = %run_id,
            colli = input.colli_packed,
            yield_percent = %run.packaging_yield.yield_percent,
            "Packaging run recorded"
        );
        Ok(run)
    }

    /// List packaging runs, newest first
    pub async fn list_packaging_runs(&self, filter: PackagingRunFilter) -> AppResult<Vec<PackagingRunWithYield>> {
        let rows = sqlx::query_as::<_, PackagingRunRow>(&format!(
            r#"{}
            WHERE ($1::uuid IS NULL OR r.order_id = $1)
              AND ($2::date IS NULL OR r.run_date >= $2)
              AND ($3::date IS NULL OR r.run_date <= $3)
            ORDER BY r.run_date DESC, r.created_at DESC
            "#,
            RUN_SELECT
        ))
        .bind(filter.order_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(PackagingRunWithYield::from).collect())
    }

    /// Get a packaging run by ID
    pub async fn get_packaging_run(&self, id: Uuid) -> AppResult<PackagingRunWithYield> {
        let row = sqlx::query_as::<_, PackagingRunRow>(&format!("{} WHERE r.id = $1", RUN_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Packaging run".to_string()))?;

        Ok(row.into())
    }
}
