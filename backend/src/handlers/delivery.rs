//! HTTP handlers for deliveries, direct sales and delivery plans

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::delivery::{
    CreateDeliveryInput, CreateDeliveryPlanInput, CreateDirectSaleInput, DeliveryFilter,
    DeliveryPlanFilter, DeliveryService,
};
use crate::AppState;
use shared::{Delivery, DeliveryPlan, DirectSale};

#[derive(Debug, Deserialize)]
pub struct ListDirectSalesQuery {
    pub farmer_id: Option<Uuid>,
}

fn service(state: &AppState) -> DeliveryService {
    DeliveryService::new(state.db.clone(), state.config.stock.allow_negative)
}

/// Record a delivery
pub async fn create_delivery(
    State(state): State<AppState>,
    Json(input): Json<CreateDeliveryInput>,
) -> AppResult<(StatusCode, Json<Delivery>)> {
    let delivery = service(&state).create_delivery(input).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

/// List deliveries
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(filter): Query<DeliveryFilter>,
) -> AppResult<Json<Vec<Delivery>>> {
    let deliveries = service(&state).list_deliveries(filter).await?;
    Ok(Json(deliveries))
}

/// Get a delivery
pub async fn get_delivery(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Delivery>> {
    let delivery = service(&state).get_delivery(id).await?;
    Ok(Json(delivery))
}

/// Cancel a delivery
pub async fn cancel_delivery(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Delivery>> {
    let delivery = service(&state).cancel_delivery(id).await?;
    Ok(Json(delivery))
}

/// Record a direct sale by a farmer
pub async fn create_direct_sale(
    State(state): State<AppState>,
    Json(input): Json<CreateDirectSaleInput>,
) -> AppResult<(StatusCode, Json<DirectSale>)> {
    let sale = service(&state).record_direct_sale(input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// List direct sales
pub async fn list_direct_sales(
    State(state): State<AppState>,
    Query(query): Query<ListDirectSalesQuery>,
) -> AppResult<Json<Vec<DirectSale>>> {
    let sales = service(&state).list_direct_sales(query.farmer_id).await?;
    Ok(Json(sales))
}

/// Create or replace a weekly delivery plan
pub async fn upsert_delivery_plan(
    State(state): State<AppState>,
    Json(input): Json<CreateDeliveryPlanInput>,
) -> AppResult<Json<DeliveryPlan>> {
    let plan = service(&state).upsert_delivery_plan(input).await?;
    Ok(Json(plan))
}

/// List delivery plans
pub async fn list_delivery_plans(
    State(state): State<AppState>,
    Query(filter): Query<DeliveryPlanFilter>,
) -> AppResult<Json<Vec<DeliveryPlan>>> {
    let plans = service(&state).list_delivery_plans(filter).await?;
    Ok(Json(plans))
}
