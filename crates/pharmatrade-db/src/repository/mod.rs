//! # Repository Module
//!
//! Database repository implementations for PharmaTrade.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.orders().place_order(account_id, &cart)              │
//! │       ▼                                                                 │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐        │
//! │  │ProductRepository │ │AccountRepository │ │ OrderRepository  │        │
//! │  │ list_active      │ │ insert           │ │ place_order ★    │        │
//! │  │ get_by_id        │ │ find_by_email    │ │ get_with_lines   │        │
//! │  │ insert / update  │ │ list_pending_..  │ │ list_for_account │        │
//! │  │ soft_delete      │ │ review           │ │                  │        │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────┘        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  ★ the only operation that coordinates several rows in one            │
//! │    transaction                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod account;
pub mod order;
pub mod product;
