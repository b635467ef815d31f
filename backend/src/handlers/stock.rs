//! HTTP handlers for the stock ledgers
//!
//! Routes are keyed by owner kind (`farmer`, `packing_station`,
//! `packing_plant`) and owner ID.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::stock::{
    InventoryCountInput, InventoryCountResult, ManualMovementInput, MovementFilter,
    ReconciliationReport, StockLedgerService,
};
use crate::AppState;
use shared::{StockBalance, StockMovement, StockOwnerKind};

fn ledger(state: &AppState) -> StockLedgerService {
    StockLedgerService::new(state.db.clone(), state.config.stock.allow_negative)
}

/// List current balances of an owner
pub async fn list_balances(
    State(state): State<AppState>,
    Path((kind, owner_id)): Path<(StockOwnerKind, Uuid)>,
) -> AppResult<Json<Vec<StockBalance>>> {
    let balances = ledger(&state).list_balances(kind, owner_id).await?;
    Ok(Json(balances))
}

/// List movements of an owner
pub async fn list_movements(
    State(state): State<AppState>,
    Path((kind, owner_id)): Path<(StockOwnerKind, Uuid)>,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let movements = ledger(&state).list_movements(kind, owner_id, filter).await?;
    Ok(Json(movements))
}

/// Book a harvest or a loss
pub async fn record_movement(
    State(state): State<AppState>,
    Path((kind, owner_id)): Path<(StockOwnerKind, Uuid)>,
    Json(input): Json<ManualMovementInput>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    let movement = ledger(&state).record_manual_movement(kind, owner_id, input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Record a physical stock count
pub async fn take_inventory(
    State(state): State<AppState>,
    Path((kind, owner_id)): Path<(StockOwnerKind, Uuid)>,
    Json(input): Json<InventoryCountInput>,
) -> AppResult<Json<InventoryCountResult>> {
    let result = ledger(&state).take_inventory(kind, owner_id, input).await?;
    Ok(Json(result))
}

/// Check balances against movement history
pub async fn reconcile(
    State(state): State<AppState>,
    Path((kind, owner_id)): Path<(StockOwnerKind, Uuid)>,
) -> AppResult<Json<ReconciliationReport>> {
    let report = ledger(&state).reconcile(kind, owner_id).await?;
    Ok(Json(report))
}
