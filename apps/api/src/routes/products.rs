//! Catalog endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use pharmatrade_core::{Money, Product, ProductInput};

use crate::authz::{AdminOnly, AnyAccount, Authorized};
use crate::error::ApiError;
use crate::routes::ApiJson;
use crate::AppState;

/// Product as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    /// Major units, e.g. `12.5`
    pub price: f64,
    pub price_cents: i64,
    pub stock_quantity: i64,
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        ProductDto {
            id: product.id,
            price: product.price().as_major_units(),
            price_cents: product.price_cents,
            stock_quantity: product.stock_quantity,
            name: product.name,
        }
    }
}

/// Body of create and update requests.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub price: f64,
    pub stock_quantity: i64,
}

impl TryFrom<ProductRequest> for ProductInput {
    type Error = ApiError;

    fn try_from(body: ProductRequest) -> Result<Self, Self::Error> {
        let price = Money::from_major_units(body.price).ok_or_else(|| {
            ApiError::validation("price must be an amount with at most two decimal places")
        })?;

        let input = ProductInput {
            name: body.name,
            price,
            stock_quantity: body.stock_quantity,
        };

        Ok(input.validated()?)
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /api/products
#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    _caller: Authorized<AnyAccount>,
) -> Result<Json<Vec<ProductDto>>, ApiError> {
    let products = state.db.products().list_active().await?;
    Ok(Json(products.into_iter().map(ProductDto::from).collect()))
}

/// POST /api/products
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    caller: Authorized<AdminOnly>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<(StatusCode, Json<ProductDto>), ApiError> {
    let input = ProductInput::try_from(body)?;
    let product = state.db.products().insert(input).await?;

    info!(product_id = product.id, by = caller.account_id(), "Product created");
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// PUT /api/products/{id}
#[tracing::instrument(skip(state, caller, body))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    caller: Authorized<AdminOnly>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<Json<ProductDto>, ApiError> {
    let input = ProductInput::try_from(body)?;
    let product = state.db.products().update(id, input).await?;

    info!(product_id = id, by = caller.account_id(), "Product updated");
    Ok(Json(product.into()))
}

/// DELETE /api/products/{id}
#[tracing::instrument(skip(state, caller))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    caller: Authorized<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.products().soft_delete(id).await?;

    info!(product_id = id, by = caller.account_id(), "Product deleted");
    Ok(Json(MessageResponse {
        message: format!("Product ID {} deleted successfully", id),
    }))
}
