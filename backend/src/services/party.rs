//! Party service: farmers, packing stations, packing plants and customers

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::{validate_email, validate_name, Party, PartyKind};

/// Party service for master data of all trading partners
#[derive(Clone)]
pub struct PartyService {
    db: PgPool,
}

/// Database row for parties
#[derive(Debug, FromRow)]
struct PartyRow {
    id: Uuid,
    kind: String,
    name: String,
    address: Option<String>,
    contact_email: Option<String>,
    phone: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PartyRow> for Party {
    type Error = AppError;

    fn try_from(row: PartyRow) -> Result<Self, Self::Error> {
        Ok(Party {
            id: row.id,
            kind: row.kind.parse()?,
            name: row.name,
            address: row.address,
            contact_email: row.contact_email,
            phone: row.phone,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for creating a party
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePartyInput {
    pub kind: PartyKind,
    pub name: String,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
    pub contact_email: Option<String>,
    #[validate(length(max = 64))]
    pub phone: Option<String>,
}

/// Input for updating a party; absent fields stay unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePartyInput {
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
    pub contact_email: Option<String>,
    #[validate(length(max = 64))]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

/// Filters for party listings
#[derive(Debug, Deserialize, Default)]
pub struct PartyFilter {
    pub kind: Option<PartyKind>,
    pub active: Option<bool>,
}

const PARTY_COLUMNS: &str =
    "id, kind, name, address, contact_email, phone, is_active, created_at, updated_at";

/// Check that `id` names an existing party of `kind`
pub async fn ensure_party<'e, E>(executor: E, id: Uuid, kind: PartyKind) -> AppResult<()>
where
    E: PgExecutor<'e>,
{
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM parties WHERE id = $1 AND kind = $2)",
    )
    .bind(id)
    .bind(kind.as_str())
    .fetch_one(executor)
    .await?;

    if !exists {
        return Err(AppError::NotFound(kind.label().to_string()));
    }
    Ok(())
}

fn check_contact(name: Option<&str>, email: Option<&str>) -> AppResult<()> {
    if let Some(name) = name {
        validate_name(name).map_err(|m| AppError::invalid("name", m))?;
    }
    if let Some(email) = email {
        validate_email(email).map_err(|m| AppError::invalid("contact_email", m))?;
    }
    Ok(())
}

impl PartyService {
    /// Create a new PartyService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a party
    pub async fn create(&self, input: CreatePartyInput) -> AppResult<Party> {
        input.validate()?;
        check_contact(Some(&input.name), input.contact_email.as_deref())?;

        let row = sqlx::query_as::<_, PartyRow>(&format!(
            r#"
            INSERT INTO parties (kind, name, address, contact_email, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PARTY_COLUMNS
        ))
        .bind(input.kind.as_str())
        .bind(input.name.trim())
        .bind(&input.address)
        .bind(&input.contact_email)
        .bind(&input.phone)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(party_id = %row.id, kind = input.kind.as_str(), "Party created");
        row.try_into()
    }

    /// List parties, optionally of one kind
    pub async fn list(&self, filter: PartyFilter) -> AppResult<Vec<Party>> {
        let rows = sqlx::query_as::<_, PartyRow>(&format!(
            r#"
            SELECT {}
            FROM parties
            WHERE ($1::varchar IS NULL OR kind = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY kind, name
            "#,
            PARTY_COLUMNS
        ))
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.active)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Party::try_from).collect()
    }

    /// Get a party by ID
    pub async fn get(&self, id: Uuid) -> AppResult<Party> {
        let row = sqlx::query_as::<_, PartyRow>(&format!(
            "SELECT {} FROM parties WHERE id = $1",
            PARTY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Party".to_string()))?;

        row.try_into()
    }

    /// Update a party
    pub async fn update(&self, id: Uuid, input: UpdatePartyInput) -> AppResult<Party> {
        input.validate()?;
        check_contact(input.name.as_deref(), input.contact_email.as_deref())?;

        let row = sqlx::query_as::<_, PartyRow>(&format!(
            r#"
            UPDATE parties SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                contact_email = COALESCE($4, contact_email),
                phone = COALESCE($5, phone),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PARTY_COLUMNS
        ))
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.address)
        .bind(&input.contact_email)
        .bind(&input.phone)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Party".to_string()))?;

        row.try_into()
    }
}
