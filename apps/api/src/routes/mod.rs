//! # HTTP Routes
//!
//! Route table and shared request/response plumbing.
//!
//! ## Route Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          PharmaTrade Routes                             │
//! │                                                                         │
//! │  /api                                                                   │
//! │   ├── POST   /signup            (public, multipart)     auth.rs        │
//! │   ├── POST   /login             (public)                auth.rs        │
//! │   ├── GET    /products          AnyAccount              products.rs    │
//! │   ├── POST   /products          AdminOnly               products.rs    │
//! │   ├── PUT    /products/{id}     AdminOnly               products.rs    │
//! │   ├── DELETE /products/{id}     AdminOnly               products.rs    │
//! │   ├── GET    /orders            ApprovedAccount (own)   orders.rs      │
//! │   ├── POST   /orders            ApprovedAccount         orders.rs      │
//! │   ├── GET    /orders/{id}       ApprovedAccount (owner) orders.rs      │
//! │   ├── GET    /clients           AdminOnly               admin.rs       │
//! │   └── POST   /admin/approve     AdminOnly               admin.rs       │
//! │                                                                         │
//! │  GET /uploads/{file}            AdminOnly               admin.rs       │
//! │  GET /health                    (public)                mod.rs         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod admin;
pub mod auth;
pub mod orders;
pub mod products;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequest, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;

use crate::error::ApiError;
use crate::AppState;

/// JSON body extractor whose rejections use the API error format.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Builds the complete route table.
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    let api = Router::new()
        .route(
            "/signup",
            post(auth::signup).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/login", post(auth::login))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/orders", get(orders::list).post(orders::place))
        .route("/orders/{id}", get(orders::get))
        .route("/clients", get(admin::pending_clients))
        .route("/admin/approve", post(admin::review));

    Router::new()
        .nest("/api", api)
        .route("/uploads/{file}", get(admin::license_document))
        .route("/health", get(health))
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.db.health_check().await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
    }
}
