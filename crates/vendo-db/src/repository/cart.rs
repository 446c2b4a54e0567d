//! # Cart Repository
//!
//! Database operations for carts and cart items.
//!
//! ## Storage Guarantees
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  carts                                                                  │
//! │  └── UNIQUE (user_id) WHERE status = 'active'                          │
//! │        two concurrent "create cart" calls: second one fails            │
//! │                                                                         │
//! │  cart_items                                                             │
//! │  └── UNIQUE (cart_id, product_id)                                      │
//! │        two concurrent "add P" calls: second one fails                  │
//! │                                                                         │
//! │  Both surface as DbError::UniqueViolation.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{money_from_text, percentage_from_text, quantity_from_column};
use vendo_core::{Cart, CartItem, CartStatus};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i64,
    user_id: i64,
    status: CartStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
}

impl CartRow {
    fn into_cart(self, items: Vec<CartItem>) -> Cart {
        Cart {
            id: self.id,
            user_id: self.user_id,
            status: self.status,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
            canceled_at: self.canceled_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i64,
    cart_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: String,
    discount: String,
    total_amount: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = DbError;

    fn try_from(row: CartItemRow) -> DbResult<Self> {
        Ok(CartItem {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity: quantity_from_column(row.quantity)?,
            unit_price: money_from_text("cart_items.unit_price", &row.unit_price)?,
            discount: percentage_from_text("cart_items.discount", &row.discount)?,
            total_amount: money_from_text("cart_items.total_amount", &row.total_amount)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            canceled_at: row.canceled_at,
        })
    }
}

const SELECT_CART: &str = r#"
    SELECT id, user_id, status, created_at, updated_at, canceled_at
    FROM carts
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Gets a cart with all of its items (canceled ones included).
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Cart>> {
        let row: Option<CartRow> = sqlx::query_as(&format!("{SELECT_CART} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let items = self.get_items(row.id).await?;
                Ok(Some(row.into_cart(items)))
            }
            None => Ok(None),
        }
    }

    /// Gets the user's active cart, if any.
    pub async fn find_active_for_user(&self, user_id: i64) -> DbResult<Option<Cart>> {
        let row: Option<CartRow> = sqlx::query_as(&format!(
            "{SELECT_CART} WHERE user_id = ?1 AND status = ?2"
        ))
        .bind(user_id)
        .bind(CartStatus::Active)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.get_items(row.id).await?;
                Ok(Some(row.into_cart(items)))
            }
            None => Ok(None),
        }
    }

    /// Gets all items of a cart, oldest first.
    pub async fn get_items(&self, cart_id: i64) -> DbResult<Vec<CartItem>> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            r#"
            SELECT id, cart_id, product_id, quantity, unit_price, discount, total_amount,
                   created_at, updated_at, canceled_at
            FROM cart_items
            WHERE cart_id = ?1
            ORDER BY id
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    /// Inserts a new cart together with any items it already holds.
    ///
    /// ## Errors
    /// `UniqueViolation` if the user already has an active cart.
    pub async fn insert(&self, cart: &Cart) -> DbResult<Cart> {
        debug!(user_id = cart.user_id, items = cart.items.len(), "Inserting cart");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO carts (user_id, status, created_at, updated_at, canceled_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(cart.user_id)
        .bind(cart.status)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .bind(cart.canceled_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, cart.user_id.to_string())
            }
            other => other,
        })?;

        let mut stored = cart.clone();
        stored.id = result.last_insert_rowid();

        for item in stored.items.iter_mut() {
            item.cart_id = stored.id;
            item.id = insert_item_tx(&mut tx, item).await?;
        }

        tx.commit().await?;
        Ok(stored)
    }

    /// Persists the cart header (status and timestamps).
    pub async fn update(&self, cart: &Cart) -> DbResult<Cart> {
        debug!(cart_id = cart.id, status = %cart.status, "Updating cart");

        let result = sqlx::query(
            r#"
            UPDATE carts SET
                status = ?2,
                updated_at = ?3,
                canceled_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(cart.id)
        .bind(cart.status)
        .bind(cart.updated_at)
        .bind(cart.canceled_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart", cart.id));
        }

        self.get_by_id(cart.id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", cart.id))
    }

    /// Inserts one item into an existing cart.
    ///
    /// ## Errors
    /// `UniqueViolation` if the product already has a line in the cart.
    pub async fn insert_item(&self, item: &CartItem) -> DbResult<CartItem> {
        debug!(cart_id = item.cart_id, product_id = item.product_id, "Inserting cart item");

        let mut tx = self.pool.begin().await?;
        let id = insert_item_tx(&mut tx, item).await?;
        // Any line change touches the parent cart
        sqlx::query("UPDATE carts SET updated_at = ?2 WHERE id = ?1")
            .bind(item.cart_id)
            .bind(item.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut stored = item.clone();
        stored.id = id;
        Ok(stored)
    }

    /// Persists quantity, pricing and cancellation of an item.
    pub async fn update_item(&self, item: &CartItem) -> DbResult<CartItem> {
        debug!(item_id = item.id, quantity = item.quantity, "Updating cart item");

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE cart_items SET
                quantity = ?2,
                discount = ?3,
                total_amount = ?4,
                updated_at = ?5,
                canceled_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(item.id)
        .bind(i64::from(item.quantity))
        .bind(item.discount.value().to_string())
        .bind(item.total_amount.amount().to_string())
        .bind(item.updated_at)
        .bind(item.canceled_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", item.id));
        }

        sqlx::query("UPDATE carts SET updated_at = ?2 WHERE id = ?1")
            .bind(item.cart_id)
            .bind(item.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(item.clone())
    }
}

async fn insert_item_tx(tx: &mut Transaction<'_, Sqlite>, item: &CartItem) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO cart_items (
            cart_id, product_id, quantity, unit_price, discount, total_amount,
            created_at, updated_at, canceled_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(item.cart_id)
    .bind(item.product_id)
    .bind(i64::from(item.quantity))
    .bind(item.unit_price.amount().to_string())
    .bind(item.discount.value().to_string())
    .bind(item.total_amount.amount().to_string())
    .bind(item.created_at)
    .bind(item.updated_at)
    .bind(item.canceled_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => {
            DbError::duplicate(field, format!("{}/{}", item.cart_id, item.product_id))
        }
        other => other,
    })?;

    Ok(result.last_insert_rowid())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::fixture;
    use vendo_core::Money;

    #[tokio::test]
    async fn test_insert_cart_with_item_and_reload() {
        let fx = fixture().await;
        let repo = fx.db.carts();

        let mut cart = Cart::new(fx.user.id);
        cart.add_item(CartItem::priced(fx.product.id, fx.product.price, 5).unwrap())
            .unwrap();

        let stored = repo.insert(&cart).await.unwrap();
        assert!(stored.id > 0);
        assert!(stored.items[0].id > 0);
        assert_eq!(stored.items[0].cart_id, stored.id);

        let loaded = repo.get_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CartStatus::Active);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].total_amount, Money::whole(450));
        assert_eq!(loaded.items[0].discount, stored.items[0].discount);
    }

    #[tokio::test]
    async fn test_one_active_cart_per_user() {
        let fx = fixture().await;
        let repo = fx.db.carts();

        repo.insert(&Cart::new(fx.user.id)).await.unwrap();
        let second = repo.insert(&Cart::new(fx.user.id)).await;
        assert!(matches!(second, Err(DbError::UniqueViolation { .. })));

        // A retired cart frees the slot
        let mut active = repo.find_active_for_user(fx.user.id).await.unwrap().unwrap();
        active.cancel().unwrap();
        repo.update(&active).await.unwrap();
        assert!(repo.find_active_for_user(fx.user.id).await.unwrap().is_none());
        repo.insert(&Cart::new(fx.user.id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_one_line_per_product() {
        let fx = fixture().await;
        let repo = fx.db.carts();
        let cart = repo.insert(&Cart::new(fx.user.id)).await.unwrap();

        let mut item = CartItem::priced(fx.product.id, fx.product.price, 1).unwrap();
        item.cart_id = cart.id;
        repo.insert_item(&item).await.unwrap();

        let again = repo.insert_item(&item).await;
        assert!(matches!(again, Err(DbError::UniqueViolation { .. })));
        assert_eq!(repo.get_items(cart.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_item_and_status() {
        let fx = fixture().await;
        let repo = fx.db.carts();

        let mut cart = Cart::new(fx.user.id);
        cart.add_item(CartItem::priced(fx.product.id, fx.product.price, 2).unwrap())
            .unwrap();
        let mut cart = repo.insert(&cart).await.unwrap();

        let (item, _) = cart.update_item_quantity(fx.product.id, 12).unwrap();
        repo.update_item(&item).await.unwrap();

        cart.mark_converted().unwrap();
        let updated = repo.update(&cart).await.unwrap();
        assert_eq!(updated.status, CartStatus::Converted);
        assert_eq!(updated.items[0].quantity, 12);
        assert_eq!(updated.items[0].total_amount, Money::whole(960));
    }

    #[tokio::test]
    async fn test_missing_rows() {
        let fx = fixture().await;
        let repo = fx.db.carts();
        assert!(repo.get_by_id(77).await.unwrap().is_none());

        let mut ghost = Cart::new(fx.user.id);
        ghost.id = 77;
        assert!(matches!(repo.update(&ghost).await, Err(DbError::NotFound { .. })));
    }
}
