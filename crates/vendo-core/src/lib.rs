//! # vendo-core: Pure Business Logic for Vendo
//!
//! Pricing rules, value objects, and the cart/sale aggregates. Everything
//! here is a pure function of its inputs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Vendo Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              vendo-service (orchestration over ports)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vendo-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │ discount  │  │   cart    │  │   sale    │  │   │
//! │  │   │   Money   │  │ rule table│  │   Cart    │  │   Sale    │  │   │
//! │  │   │Percentage │  │  engine   │  │ CartItem  │  │ SaleItem  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    vendo-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - non-negative `Money`
//! - [`percentage`] - `Percentage` in `[0, 100]`
//! - [`discount`] - quantity tier rules and the discount engine
//! - [`cart`] - `Cart` / `CartItem` aggregate
//! - [`sale`] - `Sale` / `SaleItem` aggregate
//! - [`events`] - outbound sale notifications
//! - [`types`] - referenced entities (Product, User, Branch)
//! - [`validation`] - structural input checks
//! - [`error`] - domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use vendo_core::{CartItem, Money};
//!
//! let unit_price = Money::new(Decimal::from(100)).unwrap();
//! let item = CartItem::priced(7, unit_price, 5).unwrap();
//!
//! // 4..=9 units earn the ten percent tier
//! assert_eq!(item.discount.value(), Decimal::from(10));
//! assert_eq!(item.total_amount.amount(), Decimal::from(450));
//! ```

pub mod cart;
pub mod discount;
pub mod error;
pub mod events;
pub mod money;
pub mod percentage;
pub mod sale;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartItem, CartStatus};
pub use discount::{DiscountEngine, DiscountTier, PricedLine, TierMatch};
pub use error::{CoreError, CoreResult, ValidationError};
pub use events::SaleEvent;
pub use money::Money;
pub use percentage::Percentage;
pub use sale::{Sale, SaleItem};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Identifier carried by an entity that has not been persisted yet.
pub const UNSAVED_ID: i64 = 0;

/// Maximum quantity of a single product on one line.
///
/// Anything above is rejected outright rather than left undiscounted.
pub const MAX_ITEM_QUANTITY: u32 = 20;

/// Smallest quantity that earns the ten percent tier.
pub const TEN_PERCENT_MIN_QUANTITY: u32 = 4;

/// Smallest quantity that earns the twenty percent tier.
pub const TWENTY_PERCENT_MIN_QUANTITY: u32 = 10;
