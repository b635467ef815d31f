//! Sales service: packed product sold to customers and the complaints raised
//! against those sales

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::catalog::fetch_product;
use crate::services::party::ensure_party;
use crate::services::pricing::customer_price_on;
use crate::services::stock::{NewMovement, StockLedgerService};
use shared::{
    check_sale_order, complaint_restock, line_amount, sale_price, validate_cost, validate_price,
    Complaint, ComplaintKind, MovementReason, MovementReference, PartyKind, Sale, StockOwnerKind,
};

/// Sales and complaints service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    ledger: StockLedgerService,
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    customer_id: Uuid,
    plant_id: Uuid,
    product_id: Uuid,
    order_id: Option<Uuid>,
    quantity_colli: i32,
    price_per_colli: Decimal,
    revenue: Decimal,
    sale_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            customer_id: row.customer_id,
            plant_id: row.plant_id,
            product_id: row.product_id,
            order_id: row.order_id,
            quantity_colli: row.quantity_colli,
            price_per_colli: row.price_per_colli,
            revenue: row.revenue,
            sale_date: row.sale_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ComplaintRow {
    id: Uuid,
    sale_id: Uuid,
    kind: String,
    affected_colli: i32,
    cost: Decimal,
    restocked: bool,
    reason: Option<String>,
    complaint_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<ComplaintRow> for Complaint {
    type Error = AppError;

    fn try_from(row: ComplaintRow) -> Result<Self, Self::Error> {
        Ok(Complaint {
            id: row.id,
            sale_id: row.sale_id,
            kind: row.kind.parse()?,
            affected_colli: row.affected_colli,
            cost: row.cost,
            restocked: row.restocked,
            reason: row.reason,
            complaint_date: row.complaint_date,
            created_at: row.created_at,
        })
    }
}

/// Input for recording a sale; without a price the configured customer price applies
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSaleInput {
    pub customer_id: Uuid,
    pub plant_id: Uuid,
    pub product_id: Uuid,
    pub order_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity_colli: i32,
    pub price_per_colli: Option<Decimal>,
    pub sale_date: NaiveDate,
}

/// Filters for sale listings
#[derive(Debug, Deserialize, Default)]
pub struct SaleFilter {
    pub customer_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Input for recording a complaint
#[derive(Debug, Deserialize, Validate)]
pub struct CreateComplaintInput {
    pub sale_id: Uuid,
    pub kind: ComplaintKind,
    #[validate(range(min = 0))]
    pub affected_colli: i32,
    #[serde(default)]
    pub cost: Decimal,
    /// Returned goods go back into plant stock
    #[serde(default)]
    pub restocked: bool,
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
    pub complaint_date: NaiveDate,
}

/// Filters for complaint listings
#[derive(Debug, Deserialize, Default)]
pub struct ComplaintFilter {
    pub sale_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

const SALE_COLUMNS: &str = "id, customer_id, plant_id, product_id, order_id, quantity_colli, \
     price_per_colli, revenue, sale_date, created_at";

const COMPLAINT_COLUMNS: &str =
    "id, sale_id, kind, affected_colli, cost, restocked, reason, complaint_date, created_at";

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool, allow_negative: bool) -> Self {
        let ledger = StockLedgerService::new(db.clone(), allow_negative);
        Self { db, ledger }
    }

    /// Record a sale and take the colli out of plant stock
    pub async fn create_sale(&self, input: CreateSaleInput) -> AppResult<Sale> {
        input.validate()?;
        ensure_party(&self.db, input.customer_id, PartyKind::Customer).await?;
        ensure_party(&self.db, input.plant_id, PartyKind::PackingPlant).await?;
        fetch_product(&self.db, input.product_id).await?;

        if let Some(order_id) = input.order_id {
            let order = sqlx::query_as::<_, (Uuid, Uuid)>(
                "SELECT customer_id, product_id FROM orders WHERE id = $1",
            )
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

            check_sale_order(order, input.customer_id, input.product_id)?;
        }

        let configured = match input.price_per_colli {
            Some(price) => {
                validate_price(price).map_err(|m| AppError::invalid("price_per_colli", m))?;
                None
            }
            None => customer_price_on(&self.db, Some(input.customer_id), input.product_id, input.sale_date)
                .await?
                .map(|p| p.price),
        };
        let price_per_colli = sale_price(input.price_per_colli, configured, input.sale_date)?;
        let revenue = line_amount(input.quantity_colli, price_per_colli)?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            INSERT INTO sales (customer_id, plant_id, product_id, order_id, quantity_colli, price_per_colli, revenue, sale_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(input.customer_id)
        .bind(input.plant_id)
        .bind(input.product_id)
        .bind(input.order_id)
        .bind(input.quantity_colli)
        .bind(price_per_colli)
        .bind(revenue)
        .bind(input.sale_date)
        .fetch_one(&mut *tx)
        .await?;

        self.ledger
            .apply(
                &mut tx,
                NewMovement {
                    owner_kind: StockOwnerKind::PackingPlant,
                    owner_id: input.plant_id,
                    item_id: input.product_id,
                    change_amount: -Decimal::from(input.quantity_colli),
                    reason: MovementReason::SaleOut,
                    reference: Some(MovementReference::sale(row.id)),
                    notes: None,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(sale_id = %row.id, colli = input.quantity_colli, revenue = %revenue, "Sale recorded");
        Ok(row.into())
    }

    /// List sales, newest first
    pub async fn list_sales(&self, filter: SaleFilter) -> AppResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            SELECT {}
            FROM sales
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::date IS NULL OR sale_date >= $2)
              AND ($3::date IS NULL OR sale_date <= $3)
            ORDER BY sale_date DESC, created_at DESC
            "#,
            SALE_COLUMNS
        ))
        .bind(filter.customer_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Sale::from).collect())
    }

    /// Get a sale by ID
    pub async fn get_sale(&self, id: Uuid) -> AppResult<Sale> {
        let row = sqlx::query_as::<_, SaleRow>(&format!("SELECT {} FROM sales WHERE id = $1", SALE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        Ok(row.into())
    }

    /// Record a complaint; a restocked return books the colli back into the plant
    pub async fn create_complaint(&self, input: CreateComplaintInput) -> AppResult<Complaint> {
        input.validate()?;
        validate_cost(input.cost).map_err(|m| AppError::invalid("cost", m))?;

        let mut tx = self.db.begin().await?;

        let sale: Sale = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales WHERE id = $1 FOR SHARE",
            SALE_COLUMNS
        ))
        .bind(input.sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?
        .into();

        let restock_colli = complaint_restock(
            input.kind,
            input.restocked,
            input.affected_colli,
            sale.quantity_colli,
        )?;

        let row = sqlx::query_as::<_, ComplaintRow>(&format!(
            r#"
            INSERT INTO complaints (sale_id, kind, affected_colli, cost, restocked, reason, complaint_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            COMPLAINT_COLUMNS
        ))
        .bind(input.sale_id)
        .bind(input.kind.as_str())
        .bind(input.affected_colli)
        .bind(input.cost)
        .bind(input.restocked)
        .bind(&input.reason)
        .bind(input.complaint_date)
        .fetch_one(&mut *tx)
        .await?;

        if restock_colli > 0 {
            self.ledger
                .apply(
                    &mut tx,
                    NewMovement {
                        owner_kind: StockOwnerKind::PackingPlant,
                        owner_id: sale.plant_id,
                        item_id: sale.product_id,
                        change_amount: Decimal::from(restock_colli),
                        reason: MovementReason::ReturnIn,
                        reference: Some(MovementReference::complaint(row.id)),
                        notes: input.reason.clone(),
                    },
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            complaint_id = %row.id,
            sale_id = %input.sale_id,
            kind = input.kind.as_str(),
            restocked = input.restocked,
            "Complaint recorded"
        );
        row.try_into()
    }

    /// List complaints, newest first
    pub async fn list_complaints(&self, filter: ComplaintFilter) -> AppResult<Vec<Complaint>> {
        let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
            r#"
            SELECT {}
            FROM complaints
            WHERE ($1::uuid IS NULL OR sale_id = $1)
              AND ($2::date IS NULL OR complaint_date >= $2)
              AND ($3::date IS NULL OR complaint_date <= $3)
            ORDER BY complaint_date DESC, created_at DESC
            "#,
            COMPLAINT_COLUMNS
        ))
        .bind(filter.sale_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Complaint::try_from).collect()
    }

    /// Get a complaint by ID
    pub async fn get_complaint(&self, id: Uuid) -> AppResult<Complaint> {
        sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {} FROM complaints WHERE id = $1",
            COMPLAINT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Complaint".to_string()))?
        .try_into()
    }
}
