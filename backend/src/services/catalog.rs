//! Catalog service: potato varieties and packaged products

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{validate_cost, validate_name, validate_positive_quantity, CookingType, Product, Variety};

/// Catalog service for varieties and products
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct VarietyRow {
    id: Uuid,
    name: String,
    cooking_type: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VarietyRow> for Variety {
    type Error = AppError;

    fn try_from(row: VarietyRow) -> Result<Self, Self::Error> {
        Ok(Variety {
            id: row.id,
            name: row.name,
            cooking_type: row.cooking_type.parse()?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    variety_id: Option<Uuid>,
    cooking_type: String,
    unit_weight_kg: Decimal,
    units_per_colli: i32,
    packing_cost_per_colli: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            name: row.name,
            variety_id: row.variety_id,
            cooking_type: row.cooking_type.parse()?,
            unit_weight_kg: row.unit_weight_kg,
            units_per_colli: row.units_per_colli,
            packing_cost_per_colli: row.packing_cost_per_colli,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for creating a variety
#[derive(Debug, Deserialize)]
pub struct CreateVarietyInput {
    pub name: String,
    pub cooking_type: CookingType,
}

/// Input for updating a variety
#[derive(Debug, Deserialize)]
pub struct UpdateVarietyInput {
    pub name: Option<String>,
    pub cooking_type: Option<CookingType>,
    pub is_active: Option<bool>,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub variety_id: Option<Uuid>,
    /// Defaults to the variety's cooking type when a variety is given
    pub cooking_type: Option<CookingType>,
    pub unit_weight_kg: Decimal,
    pub units_per_colli: i32,
    #[serde(default)]
    pub packing_cost_per_colli: Decimal,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub unit_weight_kg: Option<Decimal>,
    pub units_per_colli: Option<i32>,
    pub packing_cost_per_colli: Option<Decimal>,
    pub is_active: Option<bool>,
}

const VARIETY_COLUMNS: &str = "id, name, cooking_type, is_active, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, variety_id, cooking_type, unit_weight_kg, units_per_colli, \
     packing_cost_per_colli, is_active, created_at, updated_at";

fn check_product_numbers(
    unit_weight_kg: Option<Decimal>,
    units_per_colli: Option<i32>,
    packing_cost: Option<Decimal>,
) -> AppResult<()> {
    if let Some(weight) = unit_weight_kg {
        validate_positive_quantity(weight).map_err(|m| AppError::invalid("unit_weight_kg", m))?;
    }
    if let Some(units) = units_per_colli {
        if units <= 0 {
            return Err(AppError::invalid("units_per_colli", "Units per colli must be positive"));
        }
    }
    if let Some(cost) = packing_cost {
        validate_cost(cost).map_err(|m| AppError::invalid("packing_cost_per_colli", m))?;
    }
    Ok(())
}

/// Load a product inside any executor, for services that price or pack it
pub async fn fetch_product<'e, E>(executor: E, id: Uuid) -> AppResult<Product>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {} FROM products WHERE id = $1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))?
    .try_into()
}

/// Load a variety inside any executor
pub async fn fetch_variety<'e, E>(executor: E, id: Uuid) -> AppResult<Variety>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, VarietyRow>(&format!(
        "SELECT {} FROM varieties WHERE id = $1",
        VARIETY_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Variety".to_string()))?
    .try_into()
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Varieties
    // ========================================================================

    /// Create a variety
    pub async fn create_variety(&self, input: CreateVarietyInput) -> AppResult<Variety> {
        validate_name(&input.name).map_err(|m| AppError::invalid("name", m))?;

        let row = sqlx::query_as::<_, VarietyRow>(&format!(
            "INSERT INTO varieties (name, cooking_type) VALUES ($1, $2) RETURNING {}",
            VARIETY_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(input.cooking_type.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(AppError::unique_violation("name"))?;

        tracing::info!(variety_id = %row.id, name = %row.name, "Variety created");
        row.try_into()
    }

    /// List varieties, optionally of one cooking type
    pub async fn list_varieties(&self, cooking_type: Option<CookingType>) -> AppResult<Vec<Variety>> {
        let rows = sqlx::query_as::<_, VarietyRow>(&format!(
            r#"
            SELECT {}
            FROM varieties
            WHERE ($1::varchar IS NULL OR cooking_type = $1)
            ORDER BY name
            "#,
            VARIETY_COLUMNS
        ))
        .bind(cooking_type.map(|c| c.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Variety::try_from).collect()
    }

    /// Get a variety by ID
    pub async fn get_variety(&self, id: Uuid) -> AppResult<Variety> {
        fetch_variety(&self.db, id).await
    }

    /// Update a variety
    pub async fn update_variety(&self, id: Uuid, input: UpdateVarietyInput) -> AppResult<Variety> {
        if let Some(name) = &input.name {
            validate_name(name).map_err(|m| AppError::invalid("name", m))?;
        }

        let row = sqlx::query_as::<_, VarietyRow>(&format!(
            r#"
            UPDATE varieties SET
                name = COALESCE($2, name),
                cooking_type = COALESCE($3, cooking_type),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            VARIETY_COLUMNS
        ))
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.cooking_type.map(|c| c.as_str()))
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::unique_violation("name"))?
        .ok_or_else(|| AppError::NotFound("Variety".to_string()))?;

        row.try_into()
    }

    // ========================================================================
    // Products
    // ========================================================================

    /// Create a product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        validate_name(&input.name).map_err(|m| AppError::invalid("name", m))?;
        check_product_numbers(
            Some(input.unit_weight_kg),
            Some(input.units_per_colli),
            Some(input.packing_cost_per_colli),
        )?;

        let cooking_type = match (input.cooking_type, input.variety_id) {
            (Some(cooking_type), _) => cooking_type,
            (None, Some(variety_id)) => fetch_variety(&self.db, variety_id).await?.cooking_type,
            (None, None) => {
                return Err(AppError::invalid(
                    "cooking_type",
                    "Cooking type is required when no variety is given",
                ))
            }
        };
        if let Some(variety_id) = input.variety_id {
            fetch_variety(&self.db, variety_id).await?;
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, variety_id, cooking_type, unit_weight_kg, units_per_colli, packing_cost_per_colli)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(input.variety_id)
        .bind(cooking_type.as_str())
        .bind(input.unit_weight_kg)
        .bind(input.units_per_colli)
        .bind(input.packing_cost_per_colli)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::unique_violation("name"))?;

        tracing::info!(product_id = %row.id, name = %row.name, "Product created");
        row.try_into()
    }

    /// List products
    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Get a product by ID
    pub async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        fetch_product(&self.db, id).await
    }

    /// Update a product
    pub async fn update_product(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        if let Some(name) = &input.name {
            validate_name(name).map_err(|m| AppError::invalid("name", m))?;
        }
        check_product_numbers(input.unit_weight_kg, input.units_per_colli, input.packing_cost_per_colli)?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                unit_weight_kg = COALESCE($3, unit_weight_kg),
                units_per_colli = COALESCE($4, units_per_colli),
                packing_cost_per_colli = COALESCE($5, packing_cost_per_colli),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.unit_weight_kg)
        .bind(input.units_per_colli)
        .bind(input.packing_cost_per_colli)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::unique_violation("name"))?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        row.try_into()
    }
}
