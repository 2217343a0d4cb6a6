//! # Domain Types
//!
//! Core domain types used throughout PharmaTrade.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Account      │   │     Order       │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  account_id     │   │  id             │       │
//! │  │  email          │   │  total_cents    │   │  name           │       │
//! │  │  role           │   │  status         │   │  price_cents    │       │
//! │  │  approval_state │   └────────┬────────┘   │  stock_quantity │       │
//! │  └─────────────────┘            │            └────────▲────────┘       │
//! │                        ┌────────▼────────┐            │                │
//! │                        │   OrderLine     │            │                │
//! │                        │  ─────────────  │            │                │
//! │                        │  product_id     │────────────┘                │
//! │                        │  quantity       │                             │
//! │                        │  unit_price     │  (frozen copy)              │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are SQLite `INTEGER PRIMARY KEY` values; the frontends already
//! address products and accounts by number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// The role an account acts under.
///
/// The wire form (`"ADMIN"`, `"RETAILER"`, `"CLINIC"`) is shared by JSON
/// bodies, the `accounts.role` column and session token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    /// Platform operator: manages the catalog and reviews applicants.
    Admin,
    /// Pharmacy buying stock for resale.
    Retailer,
    /// Clinic buying stock for its own use.
    Clinic,
}

impl Role {
    /// All roles, in wire order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Retailer, Role::Clinic];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Retailer => "RETAILER",
            Role::Clinic => "CLINIC",
        }
    }

    /// Retailers and clinics must upload a license and wait for review.
    #[inline]
    pub const fn requires_review(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    /// Parses the wire form. Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "RETAILER" => Ok(Role::Retailer),
            "CLINIC" => Ok(Role::Clinic),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Approval State
// =============================================================================

/// Review state of an account.
///
/// ## State Machine
/// ```text
///              approve
///   Pending ──────────────► Approved
///      │
///      │ reject
///      ▼
///   Rejected
///
///   Approved and Rejected are terminal.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
        }
    }

    /// Returns true once a review decision has been recorded.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalState::Pending)
    }

    /// Initial state for a freshly signed-up account of the given role.
    #[inline]
    pub const fn initial_for(role: Role) -> Self {
        if role.requires_review() {
            ApprovalState::Pending
        } else {
            ApprovalState::Approved
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Status of a placed order. Orders are created `PENDING` and stay there;
/// fulfilment is handled outside this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum OrderStatus {
    #[default]
    Pending,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name shown to buyers.
    pub name: String,

    /// Unit price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Units available to order. Never negative.
    pub stock_quantity: i64,

    /// False once the product has been deleted from the catalog.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Fields supplied when creating or replacing a product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
}

impl ProductInput {
    /// Checks name, price and stock rules and returns the trimmed input.
    pub fn validated(self) -> Result<Self, ValidationError> {
        crate::validation::validate_product_name(&self.name)?;
        crate::validation::validate_price_cents(self.price.cents())?;
        crate::validation::validate_stock_quantity(self.stock_quantity)?;

        Ok(ProductInput {
            name: self.name.trim().to_string(),
            ..self
        })
    }
}

// =============================================================================
// Account
// =============================================================================

/// A marketplace account.
///
/// ## Login Gate
/// ```text
///   role = ADMIN                    → always allowed
///   role = RETAILER | CLINIC
///     approval_state = approved     → allowed
///     approval_state = pending      → 403 "pending approval"
///     approval_state = rejected     → 403 "rejected"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Account {
    pub id: i64,

    /// Stored lower-cased; unique.
    pub email: String,

    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,

    pub role: Role,

    pub approval_state: ApprovalState,

    pub company_name: Option<String>,

    /// Path of the uploaded license document, relative to the upload root.
    pub license_document: Option<String>,

    /// License number recorded by the reviewing administrator.
    pub license_number: Option<String>,

    /// Note recorded when an application is rejected.
    pub review_note: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Returns true when the account may place orders.
    #[inline]
    pub fn is_approved(&self) -> bool {
        self.role == Role::Admin || self.approval_state == ApprovalState::Approved
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A validated signup, ready to be stored.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub company_name: Option<String>,
    pub license_document: Option<String>,
}

/// An administrator's verdict on a pending application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve { license_number: Option<String> },
    Reject { note: Option<String> },
}

impl ApprovalDecision {
    /// The state the account ends up in.
    pub const fn target_state(&self) -> ApprovalState {
        match self {
            ApprovalDecision::Approve { .. } => ApprovalState::Approved,
            ApprovalDecision::Reject { .. } => ApprovalState::Rejected,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,

    /// Account that placed the order.
    pub account_id: i64,

    /// Σ(line.unit_price_cents × line.quantity)
    pub total_cents: i64,

    pub status: OrderStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item of an order.
///
/// `unit_price_cents` is a copy taken while the product row was locked, so
/// later catalog price changes never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl OrderLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents) * self.quantity
    }
}

/// An order with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

// =============================================================================
// Unit Tests
// =============================================================================
