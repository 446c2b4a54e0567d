//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Lookup by id (what carts need to snapshot a unit price)
//! - Catalog maintenance: insert, count

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::money_from_text;
use vendo_core::validation::{validate_price, validate_title};
use vendo_core::{Money, Product};

/// Fields supplied when creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Money,
}

impl NewProduct {
    pub fn new(title: impl Into<String>, price: Money) -> Self {
        NewProduct {
            title: title.into(),
            description: None,
            category: None,
            price,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    title: String,
    description: Option<String>,
    category: Option<String>,
    price: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            price: money_from_text("products.price", &row.price)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_PRODUCT: &str = r#"
    SELECT id, title, description, category, price, created_at, updated_at
    FROM products
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().get_by_id(7).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// The stored product with its generated id.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        validate_title(&product.title).map_err(|e| DbError::invalid_data("products.title", e))?;
        validate_price(product.price.amount())
            .map_err(|e| DbError::invalid_data("products.price", e))?;

        debug!(title = %product.title, price = %product.price, "Inserting product");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO products (title, description, category, price, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(product.title.trim())
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price.amount().to_string())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Product {
            id: result.last_insert_rowid(),
            title: product.title.trim().to_string(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: product.price,
            created_at: now,
            updated_at: now,
        })
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
