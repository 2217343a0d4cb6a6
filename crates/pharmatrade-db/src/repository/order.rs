//! # Order Repository (Order Engine)
//!
//! Places orders atomically against the catalog, and reads them back.
//!
//! ## Placement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(account_id, cart)          deadline: transaction_timeout  │
//! │                                                                         │
//! │  1. BEGIN                                                              │
//! │  2. for line in cart (ascending product id):                           │
//! │       UPDATE products SET updated_at = updated_at                      │
//! │       WHERE id = ? AND is_active = 1                                   │
//! │       RETURNING name, price_cents, stock_quantity   ← write lock held │
//! │         ├── no row           → ProductNotFound     ─┐                  │
//! │         ├── qty > stock      → InsufficientStock   ─┤                  │
//! │         └── total += price × qty                    │                  │
//! │  3. INSERT INTO orders (...) RETURNING id           │                  │
//! │  4. for line:                                       ├──► ROLLBACK      │
//! │       UPDATE products SET stock_quantity -= qty     │                  │
//! │       WHERE id = ? AND stock_quantity >= qty        │                  │
//! │       INSERT INTO order_lines (frozen unit price)   │                  │
//! │  5. COMMIT ─────────────────── any failure ─────────┘                  │
//! │  6. PlacedOrder { order_id, total, lines }                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Row Locking on SQLite
//! SQLite has no `SELECT ... FOR UPDATE`. A no-op `UPDATE ... RETURNING` as the
//! first statement of the transaction takes the database write lock, so a
//! second order touching the same (or any) product waits in the busy handler
//! until the first commits or rolls back, then reads the post-commit stock.
//! Two orders for the last unit can therefore never both pass step 2.
//!
//! No retries happen here. A dropped transaction (deadline hit) rolls back.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{DbError, DbResult};
use pharmatrade_core::{
    Cart, CoreError, Money, Order, OrderDetails, OrderLine, OrderQuote, OrderStatus, PricedLine,
    StockSnapshot,
};

/// Result of a successful order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order_id: i64,
    pub total: Money,
    pub lines: Vec<PricedLine>,
}

/// Repository for orders, including the placement transaction.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    transaction_timeout: Duration,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool, transaction_timeout: Duration) -> Self {
        OrderRepository {
            pool,
            transaction_timeout,
        }
    }

    /// Places an order for `account_id`.
    ///
    /// `account_id` is trusted: the caller has already checked that it is an
    /// existing, approved account.
    ///
    /// ## Errors
    /// * `Domain(ProductNotFound)` - A product is missing or deleted
    /// * `Domain(InsufficientStock)` - A line exceeds stock at the locked read
    /// * `Domain(AmountOverflow)` - Total does not fit in i64 cents
    /// * `LockTimeout` / `TransactionTimeout` / other - Store failure
    ///
    /// On any error nothing is written.
    #[instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn place_order(&self, account_id: i64, cart: &Cart) -> DbResult<PlacedOrder> {
        let deadline = self.transaction_timeout;

        match tokio::time::timeout(deadline, self.place_order_in_transaction(account_id, cart))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = deadline.as_millis() as u64,
                    "Order placement exceeded its deadline, rolled back"
                );
                Err(DbError::TransactionTimeout(deadline))
            }
        }
    }

    async fn place_order_in_transaction(
        &self,
        account_id: i64,
        cart: &Cart,
    ) -> DbResult<PlacedOrder> {
        let mut tx = self.pool.begin().await?;

        match Self::write_order(&mut tx, account_id, cart).await {
            Ok(placed) => {
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

                info!(
                    order_id = placed.order_id,
                    total_cents = placed.total.cents(),
                    "Order placed"
                );
                Ok(placed)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }

                if e.is_store_failure() {
                    error!(error = %e, "Order placement failed");
                } else {
                    warn!(reason = %e, "Order rejected");
                }
                Err(e)
            }
        }
    }

    /// Steps 2-4 of the placement flow, all on `tx`.
    async fn write_order(
        tx: &mut Transaction<'static, Sqlite>,
        account_id: i64,
        cart: &Cart,
    ) -> DbResult<PlacedOrder> {
        let mut quote = OrderQuote::new();

        for line in cart.lines() {
            let row: Option<(String, i64, i64)> = sqlx::query_as(
                r#"
                UPDATE products
                SET updated_at = updated_at
                WHERE id = ?1 AND is_active = 1
                RETURNING name, price_cents, stock_quantity
                "#,
            )
            .bind(line.product_id)
            .fetch_optional(&mut **tx)
            .await?;

            let (name, price_cents, stock) =
                row.ok_or(CoreError::ProductNotFound(line.product_id))?;

            debug!(
                product_id = line.product_id,
                requested = line.quantity,
                available = stock,
                "Locked product row"
            );

            let snapshot =
                StockSnapshot::new(line.product_id, Money::from_cents(price_cents), stock)
                    .named(name);
            quote.add(line, &snapshot)?;
        }

        let now = Utc::now();

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (account_id, total_cents, status, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(account_id)
        .bind(quote.total().cents())
        .bind(OrderStatus::Pending)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        for line in quote.lines() {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET
                    stock_quantity = stock_quantity - ?2,
                    updated_at = ?3
                WHERE id = ?1 AND stock_quantity >= ?2
                "#,
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut **tx)
            .await?;

            // The row is locked since step 2; a miss means the lock was lost.
            if result.rows_affected() == 0 {
                return Err(DbError::TransactionFailed(format!(
                    "stock for product {} changed under lock",
                    line.product_id
                )));
            }

            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, quantity, unit_price_cents)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .execute(&mut **tx)
            .await?;
        }

        let total = quote.total();
        Ok(PlacedOrder {
            order_id,
            total,
            lines: quote.into_lines(),
        })
    }

    /// Gets an order header with its lines.
    pub async fn get_with_lines(&self, order_id: i64) -> DbResult<Option<OrderDetails>> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT id, account_id, total_cents, status, created_at FROM orders WHERE id = ?1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderDetails { order, lines }))
    }

    /// Lists an account's orders, newest first.
    pub async fn list_for_account(&self, account_id: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, account_id, total_cents, status, created_at
            FROM orders
            WHERE account_id = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Counts all orders (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pharmatrade_core::{CartItem, NewAccount, ProductInput, Role};
    use std::path::PathBuf;

    /// File-backed database so several pooled connections share one store.
    struct TempDb {
        path: PathBuf,
    }

    impl TempDb {
        fn new() -> Self {
            let path =
                std::env::temp_dir().join(format!("pharmatrade-test-{}.db", uuid::Uuid::new_v4()));
            TempDb { path }
        }

        fn config(&self) -> DbConfig {
            DbConfig::new(&self.path).max_connections(8)
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let mut file = self.path.clone().into_os_string();
                file.push(suffix);
                let _ = std::fs::remove_file(file);
            }
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn buyer(db: &Database, email: &str) -> i64 {
        db.accounts()
            .insert(NewAccount {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                role: Role::Admin,
                company_name: None,
                license_document: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn product(db: &Database, name: &str, cents: i64, stock: i64) -> i64 {
        db.products()
            .insert(ProductInput {
                name: name.to_string(),
                price: Money::from_cents(cents),
                stock_quantity: stock,
            })
            .await
            .unwrap()
            .id
    }

    async fn stock_of(db: &Database, id: i64) -> i64 {
        db.products()
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }

    fn cart(items: &[(i64, i64)]) -> Cart {
        Cart::new(items.iter().map(|&(p, q)| CartItem::new(p, q)).collect()).unwrap()
    }

    #[tokio::test]
    async fn test_place_order_deducts_stock_and_totals() {
        let db = test_db().await;
        let account = buyer(&db, "buyer@x.test").await;
        let amox = product(&db, "Amoxicillin", 1250, 10).await;
        let gauze = product(&db, "Gauze", 300, 5).await;

        let placed = db
            .orders()
            .place_order(account, &cart(&[(gauze, 2), (amox, 3)]))
            .await
            .unwrap();

        assert_eq!(placed.total.cents(), 3 * 1250 + 2 * 300);
        assert_eq!(placed.lines[0].product_id, amox);
        assert_eq!(placed.lines[0].name, "Amoxicillin");
        assert_eq!(stock_of(&db, amox).await, 7);
        assert_eq!(stock_of(&db, gauze).await, 3);

        let details = db
            .orders()
            .get_with_lines(placed.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.order.account_id, account);
        assert_eq!(details.order.status, OrderStatus::Pending);
        assert_eq!(details.order.total_cents, placed.total.cents());
        let line_sum: i64 = details.lines.iter().map(|l| l.line_total().cents()).sum();
        assert_eq!(line_sum, details.order.total_cents);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = test_db().await;
        let account = buyer(&db, "buyer@x.test").await;
        let plenty = product(&db, "Saline", 100, 50).await;
        let scarce = product(&db, "Vaccine", 9000, 3).await;

        let err = db
            .orders()
            .place_order(account, &cart(&[(plenty, 10), (scarce, 5)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                requested: 5,
                available: 3,
                ..
            })
        ));
        assert_eq!(stock_of(&db, plenty).await, 50);
        assert_eq!(stock_of(&db, scarce).await, 3);
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_changes_nothing() {
        let db = test_db().await;
        let account = buyer(&db, "buyer@x.test").await;
        let real = product(&db, "Ibuprofen", 450, 20).await;

        let err = db
            .orders()
            .place_order(account, &cart(&[(real, 1), (9999, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::ProductNotFound(9999))
        ));
        assert_eq!(stock_of(&db, real).await, 20);
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleted_product_is_not_found() {
        let db = test_db().await;
        let account = buyer(&db, "buyer@x.test").await;
        let gone = product(&db, "Recalled syrup", 800, 10).await;
        db.products().soft_delete(gone).await.unwrap();

        let err = db
            .orders()
            .place_order(account, &cart(&[(gone, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_lines_checked_against_stock_once() {
        let db = test_db().await;
        let account = buyer(&db, "buyer@x.test").await;
        let id = product(&db, "Syringes", 50, 4).await;

        let err = db
            .orders()
            .place_order(account, &cart(&[(id, 2), (id, 3)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { requested: 5, .. })
        ));
        assert_eq!(stock_of(&db, id).await, 4);

        let placed = db
            .orders()
            .place_order(account, &cart(&[(id, 1), (id, 3)]))
            .await
            .unwrap();
        assert_eq!(placed.lines.len(), 1);
        assert_eq!(placed.lines[0].quantity, 4);
        assert_eq!(stock_of(&db, id).await, 0);
    }

    #[tokio::test]
    async fn test_price_change_does_not_touch_history() {
        let db = test_db().await;
        let account = buyer(&db, "buyer@x.test").await;
        let id = product(&db, "Thermometer", 1500, 10).await;

        let placed = db
            .orders()
            .place_order(account, &cart(&[(id, 2)]))
            .await
            .unwrap();

        db.products()
            .update(
                id,
                ProductInput {
                    name: "Thermometer".to_string(),
                    price: Money::from_cents(9900),
                    stock_quantity: 8,
                },
            )
            .await
            .unwrap();

        let details = db
            .orders()
            .get_with_lines(placed.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.lines[0].unit_price_cents, 1500);
        assert_eq!(details.order.total_cents, 3000);
    }

    #[tokio::test]
    async fn test_list_for_account_newest_first() {
        let db = test_db().await;
        let a = buyer(&db, "a@x.test").await;
        let b = buyer(&db, "b@x.test").await;
        let id = product(&db, "Masks", 20, 100).await;

        let first = db.orders().place_order(a, &cart(&[(id, 1)])).await.unwrap();
        let second = db.orders().place_order(a, &cart(&[(id, 2)])).await.unwrap();
        db.orders().place_order(b, &cart(&[(id, 3)])).await.unwrap();

        let orders = db.orders().list_for_account(a).await.unwrap();
        assert_eq!(
            orders.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![second.order_id, first.order_id]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_for_last_unit() {
        let tmp = TempDb::new();
        let db = Database::new(tmp.config()).await.unwrap();
        let account = buyer(&db, "buyer@x.test").await;
        let id = product(&db, "Antivenom", 120_000, 1).await;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let db = db.clone();
            let cart = cart(&[(id, 1)]);
            handles.push(tokio::spawn(async move {
                db.orders().place_order(account, &cart).await
            }));
        }

        let mut ok = 0;
        let mut out_of_stock = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { available: 0, .. })) => {
                    out_of_stock += 1
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(out_of_stock, 1);
        assert_eq!(stock_of(&db, id).await, 0);
        assert_eq!(db.orders().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_concurrent_orders_never_oversell() {
        let tmp = TempDb::new();
        let db = Database::new(tmp.config()).await.unwrap();
        let account = buyer(&db, "buyer@x.test").await;
        let hot = product(&db, "Flu vaccine", 2500, 10).await;
        let other = product(&db, "Swabs", 10, 1000).await;

        let mut handles = Vec::new();
        for i in 0..25 {
            let db = db.clone();
            // Mixed carts exercise the ascending lock order.
            let items = if i % 2 == 0 {
                vec![(other, 1), (hot, 1)]
            } else {
                vec![(hot, 1), (other, 2)]
            };
            let cart = cart(&items);
            handles.push(tokio::spawn(async move {
                db.orders().place_order(account, &cart).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { .. })) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(ok, 10);
        assert_eq!(stock_of(&db, hot).await, 0);
        assert_eq!(db.orders().count().await.unwrap(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lock_wait_is_bounded() {
        let tmp = TempDb::new();
        let db = Database::new(tmp.config().lock_timeout(Duration::from_millis(200)))
            .await
            .unwrap();
        let account = buyer(&db, "buyer@x.test").await;
        let id = product(&db, "Oxygen mask", 700, 5).await;

        // Hold the write lock from another connection.
        let mut blocker = db.pool().begin().await.unwrap();
        sqlx::query("UPDATE products SET updated_at = updated_at")
            .execute(&mut *blocker)
            .await
            .unwrap();

        let err = db
            .orders()
            .place_order(account, &cart(&[(id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::LockTimeout));

        blocker.rollback().await.unwrap();
        assert_eq!(stock_of(&db, id).await, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_transaction_deadline() {
        let tmp = TempDb::new();
        let db = Database::new(
            tmp.config()
                .lock_timeout(Duration::from_secs(5))
                .transaction_timeout(Duration::from_millis(150)),
        )
        .await
        .unwrap();
        let account = buyer(&db, "buyer@x.test").await;
        let id = product(&db, "Defibrillator pads", 5000, 2).await;

        let mut blocker = db.pool().begin().await.unwrap();
        sqlx::query("UPDATE products SET updated_at = updated_at")
            .execute(&mut *blocker)
            .await
            .unwrap();

        let err = db
            .orders()
            .place_order(account, &cart(&[(id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::TransactionTimeout(_)));

        blocker.rollback().await.unwrap();
        assert_eq!(stock_of(&db, id).await, 2);
    }
}
