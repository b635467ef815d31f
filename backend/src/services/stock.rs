//! Stock ledger service
//!
//! One implementation serves the farmer, packing-station and packing-plant
//! ledgers. Every write goes through [`StockLedgerService::apply`], which
//! appends the movement and updates the balance on the caller's transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::party::ensure_party;
use shared::{
    check_movement, find_mismatches, inventory_delta, validate_counted_quantity,
    validate_positive_quantity, BalanceMismatch, MovementReason, MovementReference, Pagination,
    StockBalance, StockItemKind, StockMovement, StockOwnerKind,
};

/// Stock ledger service for all owner kinds
#[derive(Clone)]
pub struct StockLedgerService {
    db: PgPool,
    allow_negative: bool,
}

/// Table layout of one ledger
struct LedgerTables {
    balance: &'static str,
    movements: &'static str,
    owner_column: &'static str,
    item_column: &'static str,
    item_table: &'static str,
}

fn tables(kind: StockOwnerKind) -> LedgerTables {
    match kind {
        StockOwnerKind::Farmer => LedgerTables {
            balance: "farmer_stock",
            movements: "farmer_stock_movements",
            owner_column: "farmer_id",
            item_column: "variety_id",
            item_table: "varieties",
        },
        StockOwnerKind::PackingStation => LedgerTables {
            balance: "station_stock",
            movements: "station_stock_movements",
            owner_column: "station_id",
            item_column: "variety_id",
            item_table: "varieties",
        },
        StockOwnerKind::PackingPlant => LedgerTables {
            balance: "plant_stock",
            movements: "plant_stock_movements",
            owner_column: "plant_id",
            item_column: "product_id",
            item_table: "products",
        },
    }
}

/// A movement to be written
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub owner_kind: StockOwnerKind,
    pub owner_id: Uuid,
    pub item_id: Uuid,
    pub change_amount: Decimal,
    pub reason: MovementReason,
    pub reference: Option<MovementReference>,
    pub notes: Option<String>,
}

/// Database row for a movement
#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    owner_id: Uuid,
    item_id: Uuid,
    change_amount: Decimal,
    reason: String,
    reference_type: Option<String>,
    reference_id: Option<Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl MovementRow {
    fn into_movement(self, owner_kind: StockOwnerKind) -> AppResult<StockMovement> {
        Ok(StockMovement {
            id: self.id,
            owner_kind,
            owner_id: self.owner_id,
            item_id: self.item_id,
            change_amount: self.change_amount,
            reason: self.reason.parse()?,
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

/// Database row for a balance
#[derive(Debug, FromRow)]
struct BalanceRow {
    owner_id: Uuid,
    item_id: Uuid,
    item_name: String,
    quantity: Decimal,
    updated_at: DateTime<Utc>,
}

/// Input for a manually booked movement (harvest intake, shrinkage)
#[derive(Debug, Deserialize, Validate)]
pub struct ManualMovementInput {
    pub item_id: Uuid,
    pub reason: MovementReason,
    /// Always positive; the reason decides the direction
    pub quantity: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Input for a physical stock count
#[derive(Debug, Deserialize, Validate)]
pub struct InventoryCountInput {
    pub item_id: Uuid,
    pub counted_quantity: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Outcome of a stock count
#[derive(Debug, Serialize)]
pub struct InventoryCountResult {
    pub item_id: Uuid,
    pub previous_quantity: Decimal,
    pub counted_quantity: Decimal,
    /// The correcting movement, absent when the count matched
    pub movement: Option<StockMovement>,
}

/// Filters for movement listings
#[derive(Debug, Deserialize, Default)]
pub struct MovementFilter {
    pub item_id: Option<Uuid>,
    pub reason: Option<MovementReason>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Balance check of one owner's ledger
#[derive(Debug, Serialize)]
pub struct ReconciliationReport {
    pub owner_kind: StockOwnerKind,
    pub owner_id: Uuid,
    pub checked_items: usize,
    pub is_consistent: bool,
    pub mismatches: Vec<BalanceMismatch>,
}

impl StockLedgerService {
    /// Create a new StockLedgerService instance
    pub fn new(db: PgPool, allow_negative: bool) -> Self {
        Self { db, allow_negative }
    }

    /// Append a movement and update the balance on the given connection.
    ///
    /// Callers pass an open transaction so that the movement, the balance
    /// and the originating record commit together.
    pub async fn apply(&self, conn: &mut PgConnection, movement: NewMovement) -> AppResult<StockMovement> {
        let t = tables(movement.owner_kind);

        sqlx::query(&format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            t.balance, t.owner_column, t.item_column
        ))
        .bind(movement.owner_id)
        .bind(movement.item_id)
        .execute(&mut *conn)
        .await?;

        let current = sqlx::query_scalar::<_, Decimal>(&format!(
            "SELECT quantity FROM {} WHERE {} = $1 AND {} = $2 FOR UPDATE",
            t.balance, t.owner_column, t.item_column
        ))
        .bind(movement.owner_id)
        .bind(movement.item_id)
        .fetch_one(&mut *conn)
        .await?;

        let new_balance = check_movement(
            movement.owner_kind,
            movement.reason,
            movement.change_amount,
            current,
            self.allow_negative,
        )?;

        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO {movements} ({owner}, {item}, change_amount, reason, reference_type, reference_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, {owner} AS owner_id, {item} AS item_id, change_amount, reason,
                      reference_type, reference_id, notes, created_at
            "#,
            movements = t.movements,
            owner = t.owner_column,
            item = t.item_column,
        ))
        .bind(movement.owner_id)
        .bind(movement.item_id)
        .bind(movement.change_amount)
        .bind(movement.reason.as_str())
        .bind(movement.reference.map(|r| r.kind))
        .bind(movement.reference.map(|r| r.id))
        .bind(&movement.notes)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(&format!(
            "UPDATE {} SET quantity = $3, updated_at = NOW() WHERE {} = $1 AND {} = $2",
            t.balance, t.owner_column, t.item_column
        ))
        .bind(movement.owner_id)
        .bind(movement.item_id)
        .bind(new_balance)
        .execute(&mut *conn)
        .await?;

        tracing::info!(
            owner_kind = movement.owner_kind.as_str(),
            owner_id = %movement.owner_id,
            item_id = %movement.item_id,
            reason = movement.reason.as_str(),
            change = %movement.change_amount,
            balance = %new_balance,
            "Stock movement applied"
        );

        row.into_movement(movement.owner_kind)
    }

    /// Book a harvest intake or a loss directly
    pub async fn record_manual_movement(
        &self,
        kind: StockOwnerKind,
        owner_id: Uuid,
        input: ManualMovementInput,
    ) -> AppResult<StockMovement> {
        input.validate()?;

        if !input.reason.is_manual() {
            return Err(AppError::invalid(
                "reason",
                format!("{} is booked by its workflow and cannot be entered by hand", input.reason),
            ));
        }
        validate_positive_quantity(input.quantity).map_err(|m| AppError::invalid("quantity", m))?;

        ensure_party(&self.db, owner_id, kind.party_kind()).await?;
        self.ensure_item(kind, input.item_id).await?;

        let change_amount = match input.reason.sign_rule() {
            shared::SignRule::Negative => -input.quantity,
            _ => input.quantity,
        };

        let mut tx = self.db.begin().await?;
        let movement = self
            .apply(
                &mut tx,
                NewMovement {
                    owner_kind: kind,
                    owner_id,
                    item_id: input.item_id,
                    change_amount,
                    reason: input.reason,
                    reference: None,
                    notes: input.notes,
                },
            )
            .await?;
        tx.commit().await?;

        Ok(movement)
    }

    /// Record a physical count and book the difference as an INVENTORY movement
    pub async fn take_inventory(
        &self,
        kind: StockOwnerKind,
        owner_id: Uuid,
        input: InventoryCountInput,
    ) -> AppResult<InventoryCountResult> {
        input.validate()?;
        validate_counted_quantity(input.counted_quantity)
            .map_err(|m| AppError::invalid("counted_quantity", m))?;

        ensure_party(&self.db, owner_id, kind.party_kind()).await?;
        self.ensure_item(kind, input.item_id).await?;

        let mut tx = self.db.begin().await?;

        // Lock the balance row so the delta is computed against a stable value
        let t = tables(kind);
        sqlx::query(&format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            t.balance, t.owner_column, t.item_column
        ))
        .bind(owner_id)
        .bind(input.item_id)
        .execute(&mut *tx)
        .await?;
        let previous = sqlx::query_scalar::<_, Decimal>(&format!(
            "SELECT quantity FROM {} WHERE {} = $1 AND {} = $2 FOR UPDATE",
            t.balance, t.owner_column, t.item_column
        ))
        .bind(owner_id)
        .bind(input.item_id)
        .fetch_one(&mut *tx)
        .await?;

        let movement = match inventory_delta(previous, input.counted_quantity) {
            Some(delta) => Some(
                self.apply(
                    &mut tx,
                    NewMovement {
                        owner_kind: kind,
                        owner_id,
                        item_id: input.item_id,
                        change_amount: delta,
                        reason: MovementReason::Inventory,
                        reference: None,
                        notes: input.notes,
                    },
                )
                .await?,
            ),
            None => None,
        };

        tx.commit().await?;

        Ok(InventoryCountResult {
            item_id: input.item_id,
            previous_quantity: previous,
            counted_quantity: input.counted_quantity,
            movement,
        })
    }

    /// List current balances of one owner
    pub async fn list_balances(&self, kind: StockOwnerKind, owner_id: Uuid) -> AppResult<Vec<StockBalance>> {
        ensure_party(&self.db, owner_id, kind.party_kind()).await?;

        let t = tables(kind);
        let rows = sqlx::query_as::<_, BalanceRow>(&format!(
            r#"
            SELECT s.{owner} AS owner_id, s.{item} AS item_id, i.name AS item_name,
                   s.quantity, s.updated_at
            FROM {balance} s
            JOIN {item_table} i ON i.id = s.{item}
            WHERE s.{owner} = $1
            ORDER BY i.name
            "#,
            balance = t.balance,
            owner = t.owner_column,
            item = t.item_column,
            item_table = t.item_table,
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StockBalance {
                owner_kind: kind,
                owner_id: r.owner_id,
                item_id: r.item_id,
                item_name: r.item_name,
                quantity: r.quantity,
                unit: kind.unit().to_string(),
                updated_at: r.updated_at,
            })
            .collect())
    }

    /// List movements of one owner, newest first
    pub async fn list_movements(
        &self,
        kind: StockOwnerKind,
        owner_id: Uuid,
        filter: MovementFilter,
    ) -> AppResult<Vec<StockMovement>> {
        ensure_party(&self.db, owner_id, kind.party_kind()).await?;

        let pagination = Pagination {
            page: filter.page.unwrap_or(1),
            per_page: filter.per_page.unwrap_or(Pagination::default().per_page),
        };

        let t = tables(kind);
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT id, {owner} AS owner_id, {item} AS item_id, change_amount, reason,
                   reference_type, reference_id, notes, created_at
            FROM {movements}
            WHERE {owner} = $1
              AND ($2::uuid IS NULL OR {item} = $2)
              AND ($3::varchar IS NULL OR reason = $3)
              AND ($4::date IS NULL OR created_at::date >= $4)
              AND ($5::date IS NULL OR created_at::date <= $5)
            ORDER BY created_at DESC, id
            LIMIT $6 OFFSET $7
            "#,
            movements = t.movements,
            owner = t.owner_column,
            item = t.item_column,
        ))
        .bind(owner_id)
        .bind(filter.item_id)
        .bind(filter.reason.map(|r| r.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(|r| r.into_movement(kind)).collect()
    }

    /// Compare each balance of an owner with the sum of its movements
    pub async fn reconcile(&self, kind: StockOwnerKind, owner_id: Uuid) -> AppResult<ReconciliationReport> {
        ensure_party(&self.db, owner_id, kind.party_kind()).await?;

        let t = tables(kind);
        let balances: BTreeMap<(Uuid, Uuid), Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(&format!(
            "SELECT {item}, quantity FROM {balance} WHERE {owner} = $1",
            balance = t.balance,
            owner = t.owner_column,
            item = t.item_column,
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(item, qty)| ((owner_id, item), qty))
        .collect();

        let sums: BTreeMap<(Uuid, Uuid), Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(&format!(
            "SELECT {item}, SUM(change_amount) FROM {movements} WHERE {owner} = $1 GROUP BY {item}",
            movements = t.movements,
            owner = t.owner_column,
            item = t.item_column,
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(item, sum)| ((owner_id, item), sum))
        .collect();

        let mismatches = find_mismatches(&balances, &sums);
        if !mismatches.is_empty() {
            tracing::warn!(
                owner_kind = kind.as_str(),
                owner_id = %owner_id,
                count = mismatches.len(),
                "Stock balances disagree with movement history"
            );
        }

        let mut items: Vec<&(Uuid, Uuid)> = balances.keys().chain(sums.keys()).collect();
        items.sort();
        items.dedup();

        Ok(ReconciliationReport {
            owner_kind: kind,
            owner_id,
            checked_items: items.len(),
            is_consistent: mismatches.is_empty(),
            mismatches,
        })
    }

    /// Check that the item exists in the catalog the ledger counts
    async fn ensure_item(&self, kind: StockOwnerKind, item_id: Uuid) -> AppResult<()> {
        let (table, label) = match kind.item_kind() {
            StockItemKind::Variety => ("varieties", "Variety"),
            StockItemKind::Product => ("products", "Product"),
        };

        let exists = sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            table
        ))
        .bind(item_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound(label.to_string()));
        }
        Ok(())
    }
}
