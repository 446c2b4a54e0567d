//! # Cart Aggregate
//!
//! A user's mutable collection of prospective purchase lines.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Cart Status                                    │
//! │                                                                         │
//! │                    ┌──── sale created ────►  Converted  (terminal)     │
//! │                    │                                                    │
//! │   first item ──► Active                                                │
//! │                    │                                                    │
//! │                    └──── cancel() ────────►  Canceled   (terminal)     │
//! │                                                                         │
//! │  Only an Active cart accepts item changes.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - At most one line per product (a canceled line still occupies its slot)
//! - Line quantity in `1..=20`, priced by the [`DiscountEngine`]
//! - Cancellation of a line is one-way

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::discount::{DiscountEngine, PricedLine, TierMatch};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::percentage::Percentage;
use crate::UNSAVED_ID;

// =============================================================================
// Cart Status
// =============================================================================

/// The status of a cart.
///
/// There is no "unknown" member: text that does not parse into one of
/// these fails, so an undefined status can never reach storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Accepting item changes.
    #[default]
    Active,
    /// A sale was created from this cart.
    Converted,
    /// Explicitly abandoned.
    Canceled,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Converted => "converted",
            CartStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for CartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CartStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(CartStatus::Active),
            "converted" => Ok(CartStatus::Converted),
            "canceled" | "cancelled" => Ok(CartStatus::Canceled),
            other => Err(CoreError::UnknownCartStatus(other.to_string())),
        }
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// One product line in a cart.
///
/// `unit_price` is frozen when the line is created; later product price
/// changes do not reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price: Money,
    /// Set by the discount engine.
    pub discount: Percentage,
    /// Set by the discount engine.
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl CartItem {
    /// Creates a line for `quantity` units at `unit_price` and prices it.
    ///
    /// ## Errors
    /// `QuantityLimitExceeded` above 20 units, `ZeroQuantity` for zero.
    pub fn priced(product_id: i64, unit_price: Money, quantity: u32) -> CoreResult<Self> {
        let now = Utc::now();
        let mut item = CartItem {
            id: UNSAVED_ID,
            cart_id: UNSAVED_ID,
            product_id,
            quantity,
            unit_price,
            discount: Percentage::ZERO,
            total_amount: Money::ZERO,
            created_at: now,
            updated_at: now,
            canceled_at: None,
        };
        DiscountEngine::apply(&mut item)?;
        Ok(item)
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    /// Sets a new quantity and re-prices the line.
    ///
    /// A discount the new quantity no longer earns is cleared. On error the
    /// line keeps its previous quantity and pricing.
    pub fn change_quantity(&mut self, quantity: u32) -> CoreResult<TierMatch> {
        let previous = self.quantity;
        self.quantity = quantity;
        match DiscountEngine::apply(self) {
            Ok(matched) => {
                self.updated_at = Utc::now();
                Ok(matched)
            }
            Err(err) => {
                self.quantity = previous;
                Err(err)
            }
        }
    }

    /// Marks the line canceled. Cannot be undone.
    pub fn cancel(&mut self) -> CoreResult<()> {
        if self.is_canceled() {
            return Err(CoreError::already_canceled("Cart item", self.id));
        }
        let now = Utc::now();
        self.canceled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

impl PricedLine for CartItem {
    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn discount(&self) -> Percentage {
        self.discount
    }

    fn set_pricing(&mut self, discount: Percentage, total_amount: Money) {
        self.discount = discount;
        self.total_amount = total_amount;
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A user's shopping cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    pub status: CartStatus,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Creates a new empty, active cart for `user_id`.
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Cart {
            id: UNSAVED_ID,
            user_id,
            status: CartStatus::Active,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
            canceled_at: None,
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == CartStatus::Canceled
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }

    /// The line for `product_id`, canceled or not.
    pub fn item(&self, product_id: i64) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Lines that still count towards the cart.
    pub fn active_items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|item| !item.is_canceled())
    }

    /// Sum of non-canceled line totals.
    pub fn total_amount(&self) -> CoreResult<Money> {
        Money::total(self.active_items().map(|item| item.total_amount))
    }

    fn ensure_active(&self) -> CoreResult<()> {
        if !self.is_active() {
            return Err(CoreError::InvalidCartStatus {
                cart_id: self.id,
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    fn item_mut(&mut self, product_id: i64) -> CoreResult<&mut CartItem> {
        let cart_id = self.id;
        self.items
            .iter_mut()
            .find(|item| item.product_id == product_id)
            .ok_or(CoreError::CartItemNotFound {
                cart_id,
                product_id,
            })
    }

    /// Adds a priced line.
    ///
    /// ## Behavior
    /// ```text
    /// add_item(P, qty 2)
    ///      │
    ///      ├── cart not Active?    → InvalidCartStatus
    ///      ├── P already has line? → DuplicateProduct (use update instead)
    ///      │
    ///      └── OK → line attached to this cart
    /// ```
    pub fn add_item(&mut self, mut item: CartItem) -> CoreResult<&CartItem> {
        self.ensure_active()?;

        if self.item(item.product_id).is_some() {
            return Err(CoreError::DuplicateProduct {
                cart_id: self.id,
                product_id: item.product_id,
            });
        }

        item.cart_id = self.id;
        self.updated_at = Utc::now();
        let index = self.items.len();
        self.items.push(item);
        Ok(&self.items[index])
    }

    /// Changes the quantity of an existing line and re-prices it.
    pub fn update_item_quantity(
        &mut self,
        product_id: i64,
        quantity: u32,
    ) -> CoreResult<(CartItem, TierMatch)> {
        self.ensure_active()?;

        let item = self.item_mut(product_id)?;
        if item.is_canceled() {
            return Err(CoreError::already_canceled("Cart item", item.id));
        }
        let matched = item.change_quantity(quantity)?;
        let updated = item.clone();

        self.updated_at = updated.updated_at;
        Ok((updated, matched))
    }

    /// Cancels a single line.
    pub fn cancel_item(&mut self, product_id: i64) -> CoreResult<CartItem> {
        self.ensure_active()?;

        let item = self.item_mut(product_id)?;
        item.cancel()?;
        let canceled = item.clone();

        self.updated_at = canceled.updated_at;
        Ok(canceled)
    }

    /// `Active → Canceled`.
    pub fn cancel(&mut self) -> CoreResult<()> {
        if self.is_cancelled() {
            return Err(CoreError::already_canceled("Cart", self.id));
        }
        self.ensure_active()?;

        let now = Utc::now();
        self.status = CartStatus::Canceled;
        self.canceled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// `Active → Converted`.
    pub fn mark_converted(&mut self) -> CoreResult<()> {
        self.ensure_active()?;

        self.status = CartStatus::Converted;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn cart_with(items: &[(i64, u32)]) -> Cart {
        let mut cart = Cart::new(1);
        cart.id = 10;
        for (product_id, quantity) in items {
            let item = CartItem::priced(*product_id, Money::whole(100), *quantity).unwrap();
            cart.add_item(item).unwrap();
        }
        cart
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("active".parse::<CartStatus>().unwrap(), CartStatus::Active);
        assert_eq!("Converted".parse::<CartStatus>().unwrap(), CartStatus::Converted);
        assert_eq!("cancelled".parse::<CartStatus>().unwrap(), CartStatus::Canceled);
        assert!(matches!(
            "unknown".parse::<CartStatus>(),
            Err(CoreError::UnknownCartStatus(_))
        ));
    }

    #[test]
    fn test_new_cart_is_active() {
        let cart = Cart::new(7);
        assert_eq!(cart.status, CartStatus::Active);
        assert_eq!(CartStatus::default(), CartStatus::Active);
        assert_eq!(cart.user_id, 7);
        assert!(cart.items.is_empty());
        assert!(!cart.is_cancelled());
    }

    #[test]
    fn test_add_item_prices_line() {
        let cart = cart_with(&[(1, 2), (2, 5), (3, 15)]);

        let totals: Vec<Money> = cart.items.iter().map(|i| i.total_amount).collect();
        assert_eq!(
            totals,
            vec![Money::whole(200), Money::whole(450), Money::whole(1200)]
        );
        assert!(cart.items.iter().all(|i| i.cart_id == 10));
        assert_eq!(cart.total_amount().unwrap(), Money::whole(1850));
    }

    #[test]
    fn test_quantity_over_limit_never_reaches_cart() {
        let cart = cart_with(&[]);
        assert!(matches!(
            CartItem::priced(1, Money::whole(100), 21),
            Err(CoreError::QuantityLimitExceeded { .. })
        ));
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_duplicate_product_is_rejected() {
        let mut cart = cart_with(&[(1, 2)]);
        let again = CartItem::priced(1, Money::whole(100), 3).unwrap();

        assert_eq!(
            cart.add_item(again).unwrap_err(),
            CoreError::DuplicateProduct {
                cart_id: 10,
                product_id: 1
            }
        );
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_update_quantity_reprices_and_clears_unearned_discount() {
        let mut cart = cart_with(&[(1, 5)]);
        assert_eq!(cart.items[0].discount.value(), Decimal::from(10));

        let (item, matched) = cart.update_item_quantity(1, 2).unwrap();
        assert!(matched.cleared_stale_discount);
        assert!(item.discount.is_zero());
        assert_eq!(item.total_amount, Money::whole(200));
        assert_eq!(cart.items[0], item);
    }

    #[test]
    fn test_update_quantity_over_limit_keeps_line() {
        let mut cart = cart_with(&[(1, 5)]);
        assert!(cart.update_item_quantity(1, 30).is_err());
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.items[0].total_amount, Money::whole(450));
    }

    #[test]
    fn test_update_missing_item() {
        let mut cart = cart_with(&[(1, 5)]);
        assert_eq!(
            cart.update_item_quantity(99, 2).unwrap_err(),
            CoreError::CartItemNotFound {
                cart_id: 10,
                product_id: 99
            }
        );
    }

    #[test]
    fn test_cancel_item_excludes_from_total() {
        let mut cart = cart_with(&[(1, 2), (2, 1)]);
        cart.cancel_item(1).unwrap();

        assert_eq!(cart.active_items().count(), 1);
        assert_eq!(cart.total_amount().unwrap(), Money::whole(100));
        assert!(cart.cancel_item(1).is_err());
        assert!(cart.update_item_quantity(1, 3).is_err());
    }

    #[test]
    fn test_terminal_states() {
        let mut converted = cart_with(&[(1, 2)]);
        converted.mark_converted().unwrap();
        assert_eq!(converted.status, CartStatus::Converted);
        assert!(converted.cancel().is_err());
        assert!(converted.mark_converted().is_err());
        assert!(converted
            .add_item(CartItem::priced(2, Money::whole(1), 1).unwrap())
            .is_err());

        let mut canceled = cart_with(&[(1, 2)]);
        canceled.cancel().unwrap();
        assert!(canceled.is_cancelled());
        assert!(canceled.canceled_at.is_some());
        assert!(matches!(
            canceled.cancel(),
            Err(CoreError::AlreadyCanceled { .. })
        ));
        assert!(canceled.mark_converted().is_err());
    }
}
