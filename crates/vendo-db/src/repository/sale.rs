//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one transaction)                                           │
//! │     └── insert() → sales row + one sale_items row per line             │
//! │                                                                         │
//! │  2. (OPTIONAL) CANCEL ITEMS (one transaction)                          │
//! │     └── update() → sale_items.canceled_at                              │
//! │                    + sales.total_amount recomputed by the aggregate    │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL SALE                                             │
//! │     └── update() → sales.canceled_at                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{money_from_text, percentage_from_text, quantity_from_column};
use vendo_core::{Sale, SaleItem};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: i64,
    number: String,
    user_id: i64,
    branch_id: i64,
    total_amount: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> DbResult<Sale> {
        Ok(Sale {
            id: self.id,
            number: self.number,
            user_id: self.user_id,
            branch_id: self.branch_id,
            items,
            total_amount: money_from_text("sales.total_amount", &self.total_amount)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            canceled_at: self.canceled_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    id: i64,
    sale_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: String,
    discount: String,
    total_amount: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
}

impl TryFrom<SaleItemRow> for SaleItem {
    type Error = DbError;

    fn try_from(row: SaleItemRow) -> DbResult<Self> {
        Ok(SaleItem {
            id: row.id,
            sale_id: row.sale_id,
            product_id: row.product_id,
            quantity: quantity_from_column(row.quantity)?,
            unit_price: money_from_text("sale_items.unit_price", &row.unit_price)?,
            discount: percentage_from_text("sale_items.discount", &row.discount)?,
            total_amount: money_from_text("sale_items.total_amount", &row.total_amount)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            canceled_at: row.canceled_at,
        })
    }
}

const SELECT_SALE: &str = r#"
    SELECT id, number, user_id, branch_id, total_amount, created_at, updated_at, canceled_at
    FROM sales
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale with all of its items.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(&format!("{SELECT_SALE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(row).await
    }

    /// Lists a user's sales, newest first.
    pub async fn list_for_user(&self, user_id: i64, limit: u32) -> DbResult<Vec<Sale>> {
        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "{SELECT_SALE} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.get_items(row.id).await?;
            sales.push(row.into_sale(items)?);
        }
        Ok(sales)
    }

    async fn with_items(&self, row: Option<SaleRow>) -> DbResult<Option<Sale>> {
        match row {
            Some(row) => {
                let items = self.get_items(row.id).await?;
                Ok(Some(row.into_sale(items)?))
            }
            None => Ok(None),
        }
    }

    /// Gets all items of a sale in insertion order.
    pub async fn get_items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let rows: Vec<SaleItemRow> = sqlx::query_as(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price, discount, total_amount,
                   created_at, updated_at, canceled_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SaleItem::try_from).collect()
    }

    /// Inserts a sale and its items in one transaction.
    ///
    /// ## Errors
    /// `UniqueViolation` if the sale number is already used.
    pub async fn insert(&self, sale: &Sale) -> DbResult<Sale> {
        debug!(number = %sale.number, items = sale.items.len(), "Inserting sale");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO sales (
                number, user_id, branch_id, total_amount,
                created_at, updated_at, canceled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&sale.number)
        .bind(sale.user_id)
        .bind(sale.branch_id)
        .bind(sale.total_amount.amount().to_string())
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.canceled_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, sale.number.clone()),
            other => other,
        })?;

        let mut stored = sale.clone();
        stored.id = result.last_insert_rowid();

        for item in stored.items.iter_mut() {
            item.sale_id = stored.id;
            let result = sqlx::query(
                r#"
                INSERT INTO sale_items (
                    sale_id, product_id, quantity, unit_price, discount, total_amount,
                    created_at, updated_at, canceled_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(item.sale_id)
            .bind(item.product_id)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.amount().to_string())
            .bind(item.discount.value().to_string())
            .bind(item.total_amount.amount().to_string())
            .bind(item.created_at)
            .bind(item.updated_at)
            .bind(item.canceled_at)
            .execute(&mut *tx)
            .await?;
            item.id = result.last_insert_rowid();
        }

        tx.commit().await?;
        Ok(stored)
    }

    /// Persists the sale header (total, updated_at, canceled_at) together
    /// with every item's cancellation state, in one transaction.
    ///
    /// An item cancellation and the total it lowers are never stored apart.
    pub async fn update(&self, sale: &Sale) -> DbResult<Sale> {
        debug!(sale_id = sale.id, total = %sale.total_amount, "Updating sale");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                total_amount = ?2,
                updated_at = ?3,
                canceled_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(sale.id)
        .bind(sale.total_amount.amount().to_string())
        .bind(sale.updated_at)
        .bind(sale.canceled_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale.id));
        }

        for item in &sale.items {
            let result = sqlx::query(
                r#"
                UPDATE sale_items SET
                    updated_at = ?3,
                    canceled_at = ?4
                WHERE id = ?1 AND sale_id = ?2
                "#,
            )
            .bind(item.id)
            .bind(sale.id)
            .bind(item.updated_at)
            .bind(item.canceled_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Sale item", item.id));
            }
        }

        tx.commit().await?;

        self.get_by_id(sale.id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale.id))
    }

    /// Persists an item's cancellation state.
    ///
    /// Pricing columns are never rewritten after creation.
    pub async fn update_item(&self, item: &SaleItem) -> DbResult<SaleItem> {
        debug!(sale_id = item.sale_id, item_id = item.id, "Updating sale item");

        let result = sqlx::query(
            r#"
            UPDATE sale_items SET
                updated_at = ?3,
                canceled_at = ?4
            WHERE id = ?1 AND sale_id = ?2
            "#,
        )
        .bind(item.id)
        .bind(item.sale_id)
        .bind(item.updated_at)
        .bind(item.canceled_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale item", item.id));
        }

        Ok(item.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
