//! HTTP handlers for customer and farmer prices

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::pricing::{
    CreateCustomerPriceInput, CreateFarmerPriceInput, CustomerPriceQuery, PricingService,
    ResolveCustomerPriceQuery, ResolveFarmerPriceQuery, ResolvedPrice,
};
use crate::AppState;
use shared::{CustomerPrice, FarmerPrice, Quality};

#[derive(Debug, Deserialize)]
pub struct FarmerPriceQuery {
    pub quality: Option<Quality>,
}

/// Add a customer or list price
pub async fn create_customer_price(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomerPriceInput>,
) -> AppResult<(StatusCode, Json<CustomerPrice>)> {
    let price = PricingService::new(state.db).create_customer_price(input).await?;
    Ok((StatusCode::CREATED, Json(price)))
}

/// Customer price history of a product
pub async fn list_customer_prices(
    State(state): State<AppState>,
    Query(query): Query<CustomerPriceQuery>,
) -> AppResult<Json<Vec<CustomerPrice>>> {
    let prices = PricingService::new(state.db).customer_price_history(query).await?;
    Ok(Json(prices))
}

/// Customer price in force on a date
pub async fn resolve_customer_price(
    State(state): State<AppState>,
    Query(query): Query<ResolveCustomerPriceQuery>,
) -> AppResult<Json<ResolvedPrice>> {
    let price = PricingService::new(state.db).resolve_customer_price(query).await?;
    Ok(Json(price))
}

/// Add a farmer price
pub async fn create_farmer_price(
    State(state): State<AppState>,
    Json(input): Json<CreateFarmerPriceInput>,
) -> AppResult<(StatusCode, Json<FarmerPrice>)> {
    let price = PricingService::new(state.db).create_farmer_price(input).await?;
    Ok((StatusCode::CREATED, Json(price)))
}

/// Farmer price history
pub async fn list_farmer_prices(
    State(state): State<AppState>,
    Query(query): Query<FarmerPriceQuery>,
) -> AppResult<Json<Vec<FarmerPrice>>> {
    let prices = PricingService::new(state.db).farmer_price_history(query.quality).await?;
    Ok(Json(prices))
}

/// Farmer price in force on a date
pub async fn resolve_farmer_price(
    State(state): State<AppState>,
    Query(query): Query<ResolveFarmerPriceQuery>,
) -> AppResult<Json<ResolvedPrice>> {
    let price = PricingService::new(state.db).resolve_farmer_price(query).await?;
    Ok(Json(price))
}
