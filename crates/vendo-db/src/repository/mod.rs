//! # Repository Module
//!
//! Database repository implementations for Vendo.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  vendo-service port adapter                                            │
//! │       │                                                                 │
//! │       │  db.carts().find_active_for_user(7)                            │
//! │       ▼                                                                 │
//! │  CartRepository                                                        │
//! │  ├── CartRow / CartItemRow  (FromRow, TEXT decimals)                   │
//! │  └── into domain: Cart { items: Vec<CartItem> }                        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Product lookup and catalog maintenance
//! - [`UserRepository`] - User lookup
//! - [`BranchRepository`] - Branch lookup
//! - [`CartRepository`] - Carts and their items
//! - [`SaleRepository`] - Sales and their items
//! - [`OutboxRepository`] - Announced event queue

pub mod branch;
pub mod cart;
pub mod outbox;
pub mod product;
pub mod sale;
pub mod user;

pub use branch::BranchRepository;
pub use cart::CartRepository;
pub use outbox::{OutboxEntry, OutboxRepository};
pub use product::{NewProduct, ProductRepository};
pub use sale::SaleRepository;
pub use user::UserRepository;

use rust_decimal::Decimal;
use std::str::FromStr;
use vendo_core::{Money, Percentage};

use crate::error::{DbError, DbResult};

// =============================================================================
// Column Conversions
// =============================================================================
// Decimals are stored as TEXT so no precision is lost to SQLite REAL.

pub(crate) fn money_from_text(column: &str, text: &str) -> DbResult<Money> {
    let amount = Decimal::from_str(text).map_err(|e| DbError::invalid_data(column, e))?;
    Money::new(amount).map_err(|e| DbError::invalid_data(column, e))
}

pub(crate) fn percentage_from_text(column: &str, text: &str) -> DbResult<Percentage> {
    let value = Decimal::from_str(text).map_err(|e| DbError::invalid_data(column, e))?;
    Percentage::new(value).map_err(|e| DbError::invalid_data(column, e))
}

pub(crate) fn quantity_from_column(value: i64) -> DbResult<u32> {
    u32::try_from(value).map_err(|e| DbError::invalid_data("quantity", e))
}

#[cfg(test)]
pub(crate) mod test_support {
    use vendo_core::{Branch, Money, Product, User};

    use crate::{Database, DbConfig, NewProduct};

    /// In-memory database holding one user, one branch and two products
    /// priced 100.00 and 50.00.
    pub struct Fixture {
        pub db: Database,
        pub user: User,
        pub branch: Branch,
        pub product: Product,
        pub cheap_product: Product,
    }

    pub async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().insert("ana", "ana@example.com").await.unwrap();
        let branch = db.branches().insert("Downtown").await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct::new("Espresso Beans", Money::whole(100)))
            .await
            .unwrap();
        let cheap_product = db
            .products()
            .insert(&NewProduct::new("Paper Filters", Money::whole(50)))
            .await
            .unwrap();

        Fixture {
            db,
            user,
            branch,
            product,
            cheap_product,
        }
    }
}
