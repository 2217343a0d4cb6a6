//! # PharmaTrade API
//!
//! HTTP gateway for the PharmaTrade marketplace.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PharmaTrade API                                 │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  auth routes   │  │ product routes │  │  order routes              ││
//! │  │                │  │                │  │                            ││
//! │  │ • signup       │  │ • list         │  │ • place (Order Engine)     ││
//! │  │ • login        │  │ • create/update│  │ • get                      ││
//! │  │                │  │ • delete       │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │  admin routes  │  │  /health       │                                │
//! │  │ • clients      │  │                │                                │
//! │  │ • approve      │  │                │                                │
//! │  │ • uploads      │  │                │                                │
//! │  └────────────────┘  └────────────────┘                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │ Upload dir   │  │    JWT Auth              ││  │
//! │  │  │ (pharmatrade │  │              │  │                          ││  │
//! │  │  │  -db)        │  │ License docs │  │ Session tokens, Argon2   ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ApiConfig`]):
//! - `HTTP_HOST` / `HTTP_PORT` - Bind address (default: 0.0.0.0:8080)
//! - `DATABASE_PATH` - SQLite file (default: ./data/pharmatrade.db)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_LIFETIME_SECS` - Session lifetime (default: 86400)
//! - `UPLOAD_DIR` - License document directory (default: ./uploads)

pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod license;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use pharmatrade_db::Database;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ErrorCode};

use crate::auth::JwtManager;
use crate::license::LicenseStorage;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub tokens: JwtManager,
    pub licenses: LicenseStorage,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(config: ApiConfig, db: Database) -> Self {
        AppState {
            db,
            tokens: JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs),
            licenses: LicenseStorage::new(&config.upload_dir),
            config,
        }
    }
}

/// Builds the HTTP application.
pub fn build_router(state: Arc<AppState>) -> Router {
    routes::router(state)
}
