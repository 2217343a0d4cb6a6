//! # Cart and Order Pricing
//!
//! Pure half of order placement: turning a raw item list into a canonical
//! cart, and pricing that cart against stock snapshots read under lock.
//!
//! ## Where This Sits in Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/orders  [{1, 2}, {5, 1}, {1, 3}]                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Cart::new ← THIS MODULE                                               │
//! │    • rejects empty lists and bad quantities                            │
//! │    • merges repeats: product 1 → qty 5                                 │
//! │    • sorts by product id: [{1, 5}, {5, 1}]  (lock order)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Order Engine (pharmatrade-db), inside one transaction:                │
//! │    for each line:                                                       │
//! │      locked read ──► StockSnapshot                                     │
//! │      OrderQuote::add(line, snapshot) ← THIS MODULE                     │
//! │        • quantity > available → InsufficientStock                      │
//! │        • total += unit_price × quantity (checked)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert header, decrement stock, insert lines, commit                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Merging matters: checking `{1, 2}` and `{1, 3}` separately against the same
//! stock of 4 would accept both and drive stock to -1.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart
// =============================================================================

/// One requested `(product_id, quantity)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    pub product_id: i64,
    pub quantity: i64,
}

impl CartItem {
    #[inline]
    pub const fn new(product_id: i64, quantity: i64) -> Self {
        CartItem {
            product_id,
            quantity,
        }
    }
}

/// A validated cart.
///
/// ## Invariants
/// - At least one line, at most `MAX_CART_ITEMS`
/// - Product ids unique, in ascending order
/// - Every quantity in `1..=MAX_ITEM_QUANTITY`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartItem>,
}

impl Cart {
    /// Builds a cart from raw request items.
    ///
    /// ## Example
    /// ```rust
    /// use pharmatrade_core::cart::{Cart, CartItem};
    ///
    /// let cart = Cart::new(vec![
    ///     CartItem::new(5, 1),
    ///     CartItem::new(1, 2),
    ///     CartItem::new(1, 3),
    /// ])
    /// .unwrap();
    ///
    /// assert_eq!(cart.lines(), &[CartItem::new(1, 5), CartItem::new(5, 1)]);
    /// assert!(Cart::new(vec![]).is_err());
    /// ```
    pub fn new(items: Vec<CartItem>) -> CoreResult<Cart> {
        if items.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let mut merged: BTreeMap<i64, i64> = BTreeMap::new();

        for item in items {
            validate_quantity(item.quantity)?;

            let qty = merged.entry(item.product_id).or_insert(0);
            *qty = qty
                .checked_add(item.quantity)
                .ok_or_else(quantity_out_of_range)?;
        }

        if merged.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let mut lines = Vec::with_capacity(merged.len());
        for (product_id, quantity) in merged {
            if quantity > MAX_ITEM_QUANTITY {
                return Err(quantity_out_of_range().into());
            }
            lines.push(CartItem::new(product_id, quantity));
        }

        Ok(Cart { lines })
    }

    /// Lines in ascending product id order.
    #[inline]
    pub fn lines(&self) -> &[CartItem] {
        &self.lines
    }

    /// Number of distinct products.
    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false for a constructed cart; present for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn quantity_out_of_range() -> ValidationError {
    ValidationError::OutOfRange {
        field: "quantity".to_string(),
        min: 1,
        max: MAX_ITEM_QUANTITY,
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Product state observed under an exclusive lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSnapshot {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Money,
    pub available: i64,
}

impl StockSnapshot {
    pub fn new(product_id: i64, unit_price: Money, available: i64) -> Self {
        StockSnapshot {
            product_id,
            name: String::new(),
            unit_price,
            available,
        }
    }

    /// Attaches the product name for the order receipt.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A priced order line. `unit_price` is the value captured at the locked
/// read and is what gets persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Running total for an order being placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuote {
    lines: Vec<PricedLine>,
    total: Money,
}

impl OrderQuote {
    pub fn new() -> Self {
        OrderQuote::default()
    }

    /// Checks `line` against `snapshot` and adds it to the total.
    ///
    /// ## Errors
    /// - `InsufficientStock` when `line.quantity > snapshot.available`
    /// - `AmountOverflow` when the line or order total overflows
    pub fn add(&mut self, line: &CartItem, snapshot: &StockSnapshot) -> CoreResult<()> {
        debug_assert_eq!(line.product_id, snapshot.product_id);

        if line.quantity > snapshot.available {
            return Err(CoreError::InsufficientStock {
                product_id: line.product_id,
                requested: line.quantity,
                available: snapshot.available,
            });
        }

        let line_total = snapshot
            .unit_price
            .checked_mul_quantity(line.quantity)
            .ok_or(CoreError::AmountOverflow)?;

        self.total = self
            .total
            .checked_add(line_total)
            .ok_or(CoreError::AmountOverflow)?;

        self.lines.push(PricedLine {
            product_id: line.product_id,
            name: snapshot.name.clone(),
            quantity: line.quantity,
            unit_price: snapshot.unit_price,
            line_total,
        });

        Ok(())
    }

    #[inline]
    pub fn total(&self) -> Money {
        self.total
    }

    #[inline]
    pub fn lines(&self) -> &[PricedLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<PricedLine> {
        self.lines
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
