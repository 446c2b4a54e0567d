//! # Ports
//!
//! The collaborators the cart and sale workflows depend on.
//!
//! ## Dependency Direction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   CartService / SaleService                                            │
//! │          │  Arc<dyn Port>                                               │
//! │          ▼                                                              │
//! │   ┌──────────────────────────────────────────────────────────────┐     │
//! │   │  ProductLookup  UserLookup  BranchLookup                     │     │
//! │   │  CartRepository SaleRepository                               │     │
//! │   │  SaleNumberGenerator        EventAnnouncer                   │     │
//! │   └──────────────────────────────────────────────────────────────┘     │
//! │          ▲                                                              │
//! │          │ implemented by                                               │
//! │   SqliteStore (store.rs), ReceiptNumberGenerator (number.rs),          │
//! │   ChannelAnnouncer / OutboxAnnouncer / FanoutAnnouncer (events.rs)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups return `Ok(None)` for a missing row. `StoreError::NotFound` is
//! reserved for writes that target a row which no longer exists.

use async_trait::async_trait;
use thiserror::Error;

use vendo_core::{Branch, Cart, CartItem, Product, Sale, SaleEvent, SaleItem, User};

// =============================================================================
// Store Error
// =============================================================================

/// Failure reported by a port implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The row targeted by a write is gone.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A uniqueness or reference constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Anything else: connection loss, corrupt data, closed channel.
    #[error("Store failure: {0}")]
    Failure(String),
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Lookups
// =============================================================================

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn product(&self, id: i64) -> StoreResult<Option<Product>>;
}

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn user(&self, id: i64) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait BranchLookup: Send + Sync {
    async fn branch(&self, id: i64) -> StoreResult<Option<Branch>>;
}

// =============================================================================
// Repositories
// =============================================================================

/// Cart storage.
///
/// Implementations must refuse a second active cart for a user and a second
/// line for the same product in a cart with `StoreError::Conflict`.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn active_cart_for_user(&self, user_id: i64) -> StoreResult<Option<Cart>>;

    /// Cart with all of its lines, canceled ones included.
    async fn cart(&self, id: i64) -> StoreResult<Option<Cart>>;

    /// Stores a new cart and returns it with ids assigned.
    async fn create(&self, cart: &Cart) -> StoreResult<Cart>;

    /// Persists status and timestamps.
    async fn update(&self, cart: &Cart) -> StoreResult<Cart>;

    async fn add_item(&self, item: &CartItem) -> StoreResult<CartItem>;

    async fn update_item(&self, item: &CartItem) -> StoreResult<CartItem>;
}

/// Sale storage. Sale numbers are unique.
#[async_trait]
pub trait SaleRepository: Send + Sync {
    async fn create(&self, sale: &Sale) -> StoreResult<Sale>;

    async fn sale(&self, id: i64) -> StoreResult<Option<Sale>>;

    /// Persists the header and the cancellation state of every item as one
    /// unit. A partial write must never be visible.
    async fn update(&self, sale: &Sale) -> StoreResult<Sale>;

    /// Persists one item's cancellation state on its own.
    async fn update_item(&self, item: &SaleItem) -> StoreResult<SaleItem>;
}

// =============================================================================
// Sale Numbers & Events
// =============================================================================

/// Source of globally unique sale numbers.
pub trait SaleNumberGenerator: Send + Sync {
    fn next_number(&self) -> String;
}

/// Outbound notification sink.
///
/// The workflows log a failed announcement and carry on; an error here never
/// fails the operation that produced the event.
#[async_trait]
pub trait EventAnnouncer: Send + Sync {
    async fn announce(&self, event: &SaleEvent) -> StoreResult<()>;
}
