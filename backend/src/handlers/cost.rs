//! HTTP handlers for manual costs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::cost::{CostFilter, CostService, CreateManualCostInput};
use crate::AppState;
use shared::ManualCost;

/// Book a manual cost
pub async fn create_cost(
    State(state): State<AppState>,
    Json(input): Json<CreateManualCostInput>,
) -> AppResult<(StatusCode, Json<ManualCost>)> {
    let cost = CostService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(cost)))
}

/// List manual costs
pub async fn list_costs(
    State(state): State<AppState>,
    Query(filter): Query<CostFilter>,
) -> AppResult<Json<Vec<ManualCost>>> {
    let costs = CostService::new(state.db).list(filter).await?;
    Ok(Json(costs))
}

/// Delete a manual cost
pub async fn delete_cost(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    CostService::new(state.db).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
