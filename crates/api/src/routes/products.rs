//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use merch_core::ProductId;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::{ProductListing, ProductView};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<ProductListing>,
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<ProductsResponse>> {
    let listings = state.catalog().list_products().await?;

    Ok(Json(ProductsResponse {
        products: listings.as_ref().clone(),
    }))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<ProductView>> {
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid product id: {id}")))?;

    let product = state.catalog().get_product(id).await?;

    Ok(Json(product.as_ref().clone()))
}
