//! # SQLite Port Adapters
//!
//! Implements every storage port on top of [`vendo_db::Database`].
//!
//! ## Error Mapping
//! ```text
//! DbError::NotFound            → StoreError::NotFound
//! DbError::UniqueViolation     → StoreError::Conflict   (second active cart,
//! DbError::ForeignKeyViolation → StoreError::Conflict    duplicate line, sale number)
//! anything else                → StoreError::Failure
//! ```

use async_trait::async_trait;

use vendo_core::{Branch, Cart, CartItem, Product, Sale, SaleItem, User};
use vendo_db::{Database, DbError};

use crate::ports::{
    BranchLookup, CartRepository, ProductLookup, SaleRepository, StoreError, StoreResult,
    UserLookup,
};

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StoreError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                StoreError::Conflict(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => StoreError::Conflict(message),
            other => StoreError::Failure(other.to_string()),
        }
    }
}

/// All storage ports backed by one SQLite pool.
///
/// Cheap to clone; share it as `Arc<SqliteStore>` and hand the same value to
/// every service constructor.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        SqliteStore { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl ProductLookup for SqliteStore {
    async fn product(&self, id: i64) -> StoreResult<Option<Product>> {
        Ok(self.db.products().get_by_id(id).await?)
    }
}

#[async_trait]
impl UserLookup for SqliteStore {
    async fn user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.db.users().get_by_id(id).await?)
    }
}

#[async_trait]
impl BranchLookup for SqliteStore {
    async fn branch(&self, id: i64) -> StoreResult<Option<Branch>> {
        Ok(self.db.branches().get_by_id(id).await?)
    }
}

#[async_trait]
impl CartRepository for SqliteStore {
    async fn active_cart_for_user(&self, user_id: i64) -> StoreResult<Option<Cart>> {
        Ok(self.db.carts().find_active_for_user(user_id).await?)
    }

    async fn cart(&self, id: i64) -> StoreResult<Option<Cart>> {
        Ok(self.db.carts().get_by_id(id).await?)
    }

    async fn create(&self, cart: &Cart) -> StoreResult<Cart> {
        Ok(self.db.carts().insert(cart).await?)
    }

    async fn update(&self, cart: &Cart) -> StoreResult<Cart> {
        Ok(self.db.carts().update(cart).await?)
    }

    async fn add_item(&self, item: &CartItem) -> StoreResult<CartItem> {
        Ok(self.db.carts().insert_item(item).await?)
    }

    async fn update_item(&self, item: &CartItem) -> StoreResult<CartItem> {
        Ok(self.db.carts().update_item(item).await?)
    }
}

#[async_trait]
impl SaleRepository for SqliteStore {
    async fn create(&self, sale: &Sale) -> StoreResult<Sale> {
        Ok(self.db.sales().insert(sale).await?)
    }

    async fn sale(&self, id: i64) -> StoreResult<Option<Sale>> {
        Ok(self.db.sales().get_by_id(id).await?)
    }

    async fn update(&self, sale: &Sale) -> StoreResult<Sale> {
        Ok(self.db.sales().update(sale).await?)
    }

    async fn update_item(&self, item: &SaleItem) -> StoreResult<SaleItem> {
        Ok(self.db.sales().update_item(item).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendo_db::DbConfig;

    #[test]
    fn test_db_error_mapping() {
        assert_eq!(
            StoreError::from(DbError::not_found("Cart", 4)),
            StoreError::not_found("Cart", 4)
        );
        assert!(StoreError::from(DbError::duplicate("sales.number", "S-1")).is_conflict());
        assert!(matches!(
            StoreError::from(DbError::PoolExhausted),
            StoreError::Failure(_)
        ));
    }

    #[tokio::test]
    async fn test_second_active_cart_is_a_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().insert("bo", "bo@example.com").await.unwrap();
        let store = SqliteStore::new(db);

        let first = CartRepository::create(&store, &Cart::new(user.id)).await.unwrap();
        let err = CartRepository::create(&store, &Cart::new(user.id)).await.unwrap_err();
        assert!(err.is_conflict());

        let active = store.active_cart_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(active.id, first.id);
    }

    #[tokio::test]
    async fn test_missing_rows_are_none() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = SqliteStore::new(db);

        assert!(store.product(1).await.unwrap().is_none());
        assert!(store.user(1).await.unwrap().is_none());
        assert!(store.branch(1).await.unwrap().is_none());
        assert!(store.cart(1).await.unwrap().is_none());
        assert!(store.sale(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sale_item_update_through_port() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().insert("cy", "cy@example.com").await.unwrap();
        let branch = db.branches().insert("Quay").await.unwrap();
        let product = db
            .products()
            .insert(&vendo_db::NewProduct::new("Scale", vendo_core::Money::whole(20)))
            .await
            .unwrap();
        let store = SqliteStore::new(db);

        let mut cart = Cart::new(user.id);
        cart.add_item(CartItem::priced(product.id, product.price, 1).unwrap())
            .unwrap();
        let draft = Sale::from_cart(&cart, branch.id, "VND-PORT").unwrap();
        let mut sale = SaleRepository::create(&store, &draft).await.unwrap();

        let item = sale.cancel_item(sale.items[0].id).unwrap();
        let stored = SaleRepository::update_item(&store, &item).await.unwrap();
        assert!(stored.is_canceled());

        let reloaded = store.sale(sale.id).await.unwrap().unwrap();
        assert!(reloaded.items[0].is_canceled());

        let mut ghost = item;
        ghost.id = 999;
        assert_eq!(
            SaleRepository::update_item(&store, &ghost).await.unwrap_err(),
            StoreError::not_found("Sale item", 999)
        );
    }
}
