//! HTTP handlers for parties, varieties and products

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::catalog::{
    CatalogService, CreateProductInput, CreateVarietyInput, UpdateProductInput, UpdateVarietyInput,
};
use crate::services::party::{CreatePartyInput, PartyFilter, PartyService, UpdatePartyInput};
use crate::AppState;
use shared::{CookingType, Party, Product, Variety};

#[derive(Debug, Deserialize)]
pub struct ListVarietiesQuery {
    pub cooking_type: Option<CookingType>,
}

/// Create a party
pub async fn create_party(
    State(state): State<AppState>,
    Json(input): Json<CreatePartyInput>,
) -> AppResult<(StatusCode, Json<Party>)> {
    let party = PartyService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

/// List parties
pub async fn list_parties(
    State(state): State<AppState>,
    Query(filter): Query<PartyFilter>,
) -> AppResult<Json<Vec<Party>>> {
    let parties = PartyService::new(state.db).list(filter).await?;
    Ok(Json(parties))
}

/// Get a party
pub async fn get_party(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Party>> {
    let party = PartyService::new(state.db).get(id).await?;
    Ok(Json(party))
}

/// Update a party
pub async fn update_party(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePartyInput>,
) -> AppResult<Json<Party>> {
    let party = PartyService::new(state.db).update(id, input).await?;
    Ok(Json(party))
}

/// Create a variety
pub async fn create_variety(
    State(state): State<AppState>,
    Json(input): Json<CreateVarietyInput>,
) -> AppResult<(StatusCode, Json<Variety>)> {
    let variety = CatalogService::new(state.db).create_variety(input).await?;
    Ok((StatusCode::CREATED, Json(variety)))
}

/// List varieties
pub async fn list_varieties(
    State(state): State<AppState>,
    Query(query): Query<ListVarietiesQuery>,
) -> AppResult<Json<Vec<Variety>>> {
    let varieties = CatalogService::new(state.db).list_varieties(query.cooking_type).await?;
    Ok(Json(varieties))
}

/// Get a variety
pub async fn get_variety(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Variety>> {
    let variety = CatalogService::new(state.db).get_variety(id).await?;
    Ok(Json(variety))
}

/// Update a variety
pub async fn update_variety(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateVarietyInput>,
) -> AppResult<Json<Variety>> {
    let variety = CatalogService::new(state.db).update_variety(id, input).await?;
    Ok(Json(variety))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = CatalogService::new(state.db).create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// List products
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let products = CatalogService::new(state.db).list_products().await?;
    Ok(Json(products))
}

/// Get a product
pub async fn get_product(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Product>> {
    let product = CatalogService::new(state.db).get_product(id).await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let product = CatalogService::new(state.db).update_product(id, input).await?;
    Ok(Json(product))
}
