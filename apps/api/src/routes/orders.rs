//! Order placement and lookup.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pharmatrade_core::{Cart, CartItem, Order, OrderDetails, OrderStatus, PricedLine};
use pharmatrade_db::PlacedOrder;

use crate::authz::{ApprovedAccount, Authorized};
use crate::error::ApiError;
use crate::routes::ApiJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
pub struct OrderLineDto {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<PricedLine> for OrderLineDto {
    fn from(line: PricedLine) -> Self {
        OrderLineDto {
            product_id: line.product_id,
            name: line.name,
            quantity: line.quantity,
            unit_price: line.unit_price.as_major_units(),
            unit_price_cents: line.unit_price.cents(),
            line_total_cents: line.line_total.cents(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub message: String,
    pub order_id: i64,
    pub total: f64,
    pub total_cents: i64,
    pub lines: Vec<OrderLineDto>,
}

impl From<PlacedOrder> for PlaceOrderResponse {
    fn from(placed: PlacedOrder) -> Self {
        PlaceOrderResponse {
            message: "Order placed successfully".to_string(),
            order_id: placed.order_id,
            total: placed.total.as_major_units(),
            total_cents: placed.total.cents(),
            lines: placed.lines.into_iter().map(OrderLineDto::from).collect(),
        }
    }
}

/// POST /api/orders
///
/// All-or-nothing: either every line is reserved and the order recorded,
/// or nothing changes.
#[tracing::instrument(skip_all, fields(account_id = caller.account_id()))]
pub async fn place(
    State(state): State<Arc<AppState>>,
    caller: Authorized<ApprovedAccount>,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, ApiError> {
    let cart = Cart::new(body.items)?;

    let placed = match state.db.orders().place_order(caller.account_id(), &cart).await {
        Ok(placed) => placed,
        Err(e) => {
            warn!(error = %e, "Order rejected");
            return Err(e.into());
        }
    };

    info!(
        order_id = placed.order_id,
        total_cents = placed.total.cents(),
        "Order placed"
    );

    Ok(Json(placed.into()))
}

#[derive(Debug, Serialize)]
pub struct OrderSummaryDto {
    pub id: i64,
    pub account_id: i64,
    pub status: OrderStatus,
    pub total: f64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderSummaryDto {
    fn from(order: Order) -> Self {
        OrderSummaryDto {
            id: order.id,
            account_id: order.account_id,
            status: order.status,
            total: order.total().as_major_units(),
            total_cents: order.total_cents,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StoredLineDto {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderDetailsResponse {
    pub order: OrderSummaryDto,
    pub lines: Vec<StoredLineDto>,
}

impl From<OrderDetails> for OrderDetailsResponse {
    fn from(details: OrderDetails) -> Self {
        OrderDetailsResponse {
            order: details.order.into(),
            lines: details
                .lines
                .into_iter()
                .map(|line| StoredLineDto {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    line_total_cents: line.line_total().cents(),
                })
                .collect(),
        }
    }
}

/// GET /api/orders/{id}
///
/// Owners see their own orders; administrators see any.
#[tracing::instrument(skip(state, caller))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    caller: Authorized<ApprovedAccount>,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetailsResponse>, ApiError> {
    let details = state
        .db
        .orders()
        .get_with_lines(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))?;

    if details.order.account_id != caller.account_id() && !caller.is_admin() {
        warn!(order_id = id, account_id = caller.account_id(), "Order belongs to another account");
        return Err(ApiError::forbidden("Order belongs to another account"));
    }

    Ok(Json(details.into()))
}

/// GET /api/orders
///
/// The caller's own order history, newest first.
#[tracing::instrument(skip_all, fields(account_id = caller.account_id()))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    caller: Authorized<ApprovedAccount>,
) -> Result<Json<Vec<OrderSummaryDto>>, ApiError> {
    let orders = state.db.orders().list_for_account(caller.account_id()).await?;
    Ok(Json(orders.into_iter().map(OrderSummaryDto::from).collect()))
}
