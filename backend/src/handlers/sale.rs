//! HTTP handlers for sales and complaints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::sale::{
    ComplaintFilter, CreateComplaintInput, CreateSaleInput, SaleFilter, SaleService,
};
use crate::AppState;
use shared::{Complaint, Sale};

fn service(state: &AppState) -> SaleService {
    SaleService::new(state.db.clone(), state.config.stock.allow_negative)
}

/// Record a sale
pub async fn create_sale(
    State(state): State<AppState>,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<(StatusCode, Json<Sale>)> {
    let sale = service(&state).create_sale(input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// List sales
pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
) -> AppResult<Json<Vec<Sale>>> {
    let sales = service(&state).list_sales(filter).await?;
    Ok(Json(sales))
}

/// Get a sale
pub async fn get_sale(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Sale>> {
    let sale = service(&state).get_sale(id).await?;
    Ok(Json(sale))
}

/// Record a complaint
pub async fn create_complaint(
    State(state): State<AppState>,
    Json(input): Json<CreateComplaintInput>,
) -> AppResult<(StatusCode, Json<Complaint>)> {
    let complaint = service(&state).create_complaint(input).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

/// List complaints
pub async fn list_complaints(
    State(state): State<AppState>,
    Query(filter): Query<ComplaintFilter>,
) -> AppResult<Json<Vec<Complaint>>> {
    let complaints = service(&state).list_complaints(filter).await?;
    Ok(Json(complaints))
}

/// Get a complaint
pub async fn get_complaint(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Complaint>> {
    let complaint = service(&state).get_complaint(id).await?;
    Ok(Json(complaint))
}
