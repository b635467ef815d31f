//! HTTP handlers for orders and packaging runs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::order::{
    CreateOrderInput, CreatePackagingRunInput, OrderFilter, OrderService, PackagingRunFilter,
    PackagingRunWithYield, UpdateOrderStatusInput,
};
use crate::AppState;
use shared::Order;

fn service(state: &AppState) -> OrderService {
    OrderService::new(state.db.clone(), state.config.stock.allow_negative)
}

/// Create an order
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = service(&state).create_order(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = service(&state).list_orders(filter).await?;
    Ok(Json(orders))
}

/// Get an order
pub async fn get_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Order>> {
    let order = service(&state).get_order(id).await?;
    Ok(Json(order))
}

/// Advance an order's status
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOrderStatusInput>,
) -> AppResult<Json<Order>> {
    let order = service(&state).update_status(id, input).await?;
    Ok(Json(order))
}

/// Record a packaging run
pub async fn create_packaging_run(
    State(state): State<AppState>,
    Json(input): Json<CreatePackagingRunInput>,
) -> AppResult<(StatusCode, Json<PackagingRunWithYield>)> {
    let run = service(&state).create_packaging_run(input).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// List packaging runs
pub async fn list_packaging_runs(
    State(state): State<AppState>,
    Query(filter): Query<PackagingRunFilter>,
) -> AppResult<Json<Vec<PackagingRunWithYield>>> {
    let runs = service(&state).list_packaging_runs(filter).await?;
    Ok(Json(runs))
}

/// Get a packaging run
pub async fn get_packaging_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PackagingRunWithYield>> {
    let run = service(&state).get_packaging_run(id).await?;
    Ok(Json(run))
}
