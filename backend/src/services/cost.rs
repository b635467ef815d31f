//! Manual cost entries

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::{validate_cost, CostCategory, ManualCost};

/// Manual cost service
#[derive(Clone)]
pub struct CostService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ManualCostRow {
    id: Uuid,
    category: String,
    amount: Decimal,
    cost_date: NaiveDate,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ManualCostRow> for ManualCost {
    type Error = AppError;

    fn try_from(row: ManualCostRow) -> Result<Self, Self::Error> {
        Ok(ManualCost {
            id: row.id,
            category: row.category.parse()?,
            amount: row.amount,
            cost_date: row.cost_date,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

/// Input for a manual cost
#[derive(Debug, Deserialize, Validate)]
pub struct CreateManualCostInput {
    pub category: CostCategory,
    pub amount: Decimal,
    pub cost_date: NaiveDate,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Filters for cost listings
#[derive(Debug, Deserialize, Default)]
pub struct CostFilter {
    pub category: Option<CostCategory>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl CostService {
    /// Create a new CostService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Book a manual cost
    pub async fn create(&self, input: CreateManualCostInput) -> AppResult<ManualCost> {
        input.validate()?;
        validate_cost(input.amount).map_err(|m| AppError::invalid("amount", m))?;

        let row = sqlx::query_as::<_, ManualCostRow>(
            r#"
            INSERT INTO manual_costs (category, amount, cost_date, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, category, amount, cost_date, description, created_at
            "#,
        )
        .bind(input.category.as_str())
        .bind(input.amount)
        .bind(input.cost_date)
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(cost_id = %row.id, category = %row.category, amount = %row.amount, "Manual cost booked");
        row.try_into()
    }

    /// List manual costs within an optional date range
    pub async fn list(&self, filter: CostFilter) -> AppResult<Vec<ManualCost>> {
        let rows = sqlx::query_as::<_, ManualCostRow>(
            r#"
            SELECT id, category, amount, cost_date, description, created_at
            FROM manual_costs
            WHERE ($1::varchar IS NULL OR category = $1)
              AND ($2::date IS NULL OR cost_date >= $2)
              AND ($3::date IS NULL OR cost_date <= $3)
            ORDER BY cost_date DESC, created_at DESC
            "#,
        )
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ManualCost::try_from).collect()
    }

    /// Delete a manual cost
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM manual_costs WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Manual cost".to_string()));
        }

        tracing::info!(cost_id = %id, "Manual cost deleted");
        Ok(())
    }
}
