//! # pharmatrade-core: Pure Business Logic for PharmaTrade
//!
//! Domain types and rules shared by the database layer and the HTTP API.
//! Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       PharmaTrade Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/api (axum HTTP gateway)                    │   │
//! │  │    signup, login, products, orders, approvals                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ pharmatrade-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │   rules   │  │   │
//! │  │   │  Account  │  │           │  │ OrderQuote│  │   checks  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               pharmatrade-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, Order Engine transaction     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Account, Order, OrderLine, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart normalization and order pricing against stock snapshots
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use pharmatrade_core::cart::{Cart, CartItem, OrderQuote, StockSnapshot};
//! use pharmatrade_core::money::Money;
//!
//! let cart = Cart::new(vec![CartItem::new(1, 2)]).unwrap();
//! let mut quote = OrderQuote::new();
//!
//! for line in cart.lines() {
//!     let snapshot = StockSnapshot::new(line.product_id, Money::from_cents(450), 10);
//!     quote.add(line, &snapshot).unwrap();
//! }
//!
//! assert_eq!(quote.total().cents(), 900);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, OrderQuote, PricedLine, StockSnapshot};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of distinct products in a single order.
///
/// ## Business Reason
/// Bounds the number of rows one unit of work locks.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in one order.
///
/// ## Business Reason
/// Wholesale orders are large, but a typo (100000 instead of 100) should not
/// drain the catalog.
pub const MAX_ITEM_QUANTITY: i64 = 10_000;
