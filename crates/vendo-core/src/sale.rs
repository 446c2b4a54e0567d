//! # Sale Aggregate
//!
//! The record of a completed transaction, produced once from a cart.
//!
//! ## Cart to Sale Snapshot
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart #10 (Active)                    Sale VND-20260101-3f2a…           │
//! │  ┌──────────────────────────┐         ┌──────────────────────────┐     │
//! │  │ P1  qty 2  100.00   0%   │ ──────► │ P1  qty 2  100.00   0%   │     │
//! │  │ P2  qty 5  100.00  10%   │ ──────► │ P2  qty 5  100.00  10%   │     │
//! │  │ P3  (canceled)           │    ✗    │                          │     │
//! │  └──────────────────────────┘         └──────────────────────────┘     │
//! │                                                                         │
//! │  Discounts are inherited, never recomputed. After creation the only    │
//! │  mutation is cancellation (of the sale or of single items).            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartItem};
use crate::discount::PricedLine;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::percentage::Percentage;
use crate::UNSAVED_ID;

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price: Money,
    pub discount: Percentage,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl SaleItem {
    /// Copies a cart line, keeping its price, discount and total.
    pub fn from_cart_item(item: &CartItem) -> Self {
        let now = Utc::now();
        SaleItem {
            id: UNSAVED_ID,
            sale_id: UNSAVED_ID,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            discount: item.discount,
            total_amount: item.total_amount,
            created_at: now,
            updated_at: now,
            canceled_at: None,
        }
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }
}

impl PricedLine for SaleItem {
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
// Sale
// =============================================================================

/// A completed sale. Active while `canceled_at` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    /// Unique human-readable receipt number.
    pub number: String,
    pub user_id: i64,
    pub branch_id: i64,
    pub items: Vec<SaleItem>,
    /// Sum of non-canceled item totals.
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Builds a sale from the non-canceled lines of `cart`.
    ///
    /// The cart itself is not modified; the caller marks it converted once
    /// the sale is stored.
    ///
    /// ## Errors
    /// - `InvalidCartStatus` if the cart is not Active
    /// - `EmptyCart` if no line survives
    pub fn from_cart(cart: &Cart, branch_id: i64, number: impl Into<String>) -> CoreResult<Self> {
        if !cart.is_active() {
            return Err(CoreError::InvalidCartStatus {
                cart_id: cart.id,
                status: cart.status.to_string(),
            });
        }

        let items: Vec<SaleItem> = cart.active_items().map(SaleItem::from_cart_item).collect();
        if items.is_empty() {
            return Err(CoreError::EmptyCart { cart_id: cart.id });
        }

        let now = Utc::now();
        let mut sale = Sale {
            id: UNSAVED_ID,
            number: number.into(),
            user_id: cart.user_id,
            branch_id,
            items,
            total_amount: Money::ZERO,
            created_at: now,
            updated_at: now,
            canceled_at: None,
        };
        sale.recalculate_total()?;
        Ok(sale)
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    pub fn active_items(&self) -> impl Iterator<Item = &SaleItem> {
        self.items.iter().filter(|item| !item.is_canceled())
    }

    /// Recomputes `total_amount` from the non-canceled items.
    ///
    /// Repeated calls give the same result.
    pub fn recalculate_total(&mut self) -> CoreResult<Money> {
        self.total_amount = Money::total(self.active_items().map(|item| item.total_amount))?;
        Ok(self.total_amount)
    }

    /// Cancels the whole sale. Item rows keep their own state.
    pub fn cancel(&mut self) -> CoreResult<()> {
        if self.is_canceled() {
            return Err(CoreError::already_canceled("Sale", self.id));
        }
        let now = Utc::now();
        self.canceled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Cancels one item and recomputes the total.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale { items: [200.00, 50.00], total: 250.00 }
    ///      │
    ///      ▼
    /// cancel_item(first) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Sale { items: [200.00 ✗, 50.00], total: 50.00 }
    /// ```
    pub fn cancel_item(&mut self, item_id: i64) -> CoreResult<SaleItem> {
        if self.is_canceled() {
            return Err(CoreError::already_canceled("Sale", self.id));
        }

        let sale_id = self.id;
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(CoreError::SaleItemNotFound { sale_id, item_id })?;

        if item.is_canceled() {
            return Err(CoreError::already_canceled("Sale item", item_id));
        }

        let now = Utc::now();
        item.canceled_at = Some(now);
        item.updated_at = now;
        let canceled = item.clone();

        self.recalculate_total()?;
        self.updated_at = now;
        Ok(canceled)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartStatus;
    use rust_decimal::Decimal;

    fn cart(lines: &[(i64, u32, u32)]) -> Cart {
        let mut cart = Cart::new(3);
        cart.id = 10;
        for (product_id, unit, quantity) in lines {
            let item = CartItem::priced(*product_id, Money::whole(*unit), *quantity).unwrap();
            cart.add_item(item).unwrap();
        }
        cart
    }

    fn saved(mut sale: Sale) -> Sale {
        sale.id = 1;
        for (index, item) in sale.items.iter_mut().enumerate() {
            item.id = index as i64 + 1;
            item.sale_id = 1;
        }
        sale
    }

    #[test]
    fn test_from_cart_snapshots_lines() {
        let source = cart(&[(1, 100, 2), (2, 100, 5)]);
        let sale = Sale::from_cart(&source, 4, "VND-1").unwrap();

        assert_eq!(sale.user_id, 3);
        assert_eq!(sale.branch_id, 4);
        assert_eq!(sale.number, "VND-1");
        assert_eq!(sale.total_amount, Money::whole(650));

        for (line, cart_line) in sale.items.iter().zip(source.items.iter()) {
            assert_eq!(line.product_id, cart_line.product_id);
            assert_eq!(line.quantity, cart_line.quantity);
            assert_eq!(line.unit_price, cart_line.unit_price);
            assert_eq!(line.discount, cart_line.discount);
            assert_eq!(line.total_amount, cart_line.total_amount);
        }
        // Source cart is left for the caller to finalize
        assert_eq!(source.status, CartStatus::Active);
    }

    #[test]
    fn test_snapshot_matches_engine_pricing() {
        let sale = Sale::from_cart(&cart(&[(1, 100, 15)]), 1, "VND-4").unwrap();
        let mut repriced = sale.items[0].clone();
        crate::DiscountEngine::apply(&mut repriced).unwrap();
        assert_eq!(repriced, sale.items[0]);
    }

    #[test]
    fn test_from_cart_single_line() {
        let sale = Sale::from_cart(&cart(&[(1, 100, 2)]), 1, "VND-2").unwrap();
        assert_eq!(sale.total_amount, Money::whole(200));
        assert!(sale.items[0].discount.is_zero());
    }

    #[test]
    fn test_from_cart_skips_canceled_lines() {
        let mut source = cart(&[(1, 100, 2), (2, 50, 1)]);
        source.cancel_item(1).unwrap();

        let sale = Sale::from_cart(&source, 1, "VND-3").unwrap();
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.total_amount, Money::whole(50));
    }

    #[test]
    fn test_from_cart_rejects_empty_and_inactive() {
        let empty = cart(&[]);
        assert_eq!(
            Sale::from_cart(&empty, 1, "X").unwrap_err(),
            CoreError::EmptyCart { cart_id: 10 }
        );

        let mut all_canceled = cart(&[(1, 100, 2)]);
        all_canceled.cancel_item(1).unwrap();
        assert!(matches!(
            Sale::from_cart(&all_canceled, 1, "X"),
            Err(CoreError::EmptyCart { .. })
        ));

        let mut canceled = cart(&[(1, 100, 2)]);
        canceled.cancel().unwrap();
        assert!(matches!(
            Sale::from_cart(&canceled, 1, "X"),
            Err(CoreError::InvalidCartStatus { .. })
        ));

        let mut converted = cart(&[(1, 100, 2)]);
        converted.mark_converted().unwrap();
        assert!(matches!(
            Sale::from_cart(&converted, 1, "X"),
            Err(CoreError::InvalidCartStatus { .. })
        ));
    }

    #[test]
    fn test_cancel_item_recomputes_total() {
        let mut sale = saved(Sale::from_cart(&cart(&[(1, 100, 2), (2, 50, 1)]), 1, "S").unwrap());
        assert_eq!(sale.total_amount, Money::whole(250));

        let canceled = sale.cancel_item(1).unwrap();
        assert!(canceled.is_canceled());
        assert_eq!(sale.total_amount, Money::whole(50));

        // Idempotent under repeated recomputation
        assert_eq!(sale.recalculate_total().unwrap(), Money::whole(50));
        assert_eq!(sale.total_amount.amount(), Decimal::from(50));
    }

    #[test]
    fn test_cancel_item_rejections() {
        let mut sale = saved(Sale::from_cart(&cart(&[(1, 100, 2), (2, 50, 1)]), 1, "S").unwrap());

        assert_eq!(
            sale.cancel_item(99).unwrap_err(),
            CoreError::SaleItemNotFound {
                sale_id: 1,
                item_id: 99
            }
        );

        sale.cancel_item(2).unwrap();
        assert!(matches!(
            sale.cancel_item(2),
            Err(CoreError::AlreadyCanceled { .. })
        ));

        sale.cancel().unwrap();
        assert!(sale.cancel_item(1).is_err());
        assert!(sale.cancel().is_err());
    }

    #[test]
    fn test_cancel_sale_keeps_total() {
        let mut sale = saved(Sale::from_cart(&cart(&[(1, 100, 2)]), 1, "S").unwrap());
        sale.cancel().unwrap();
        assert!(sale.is_canceled());
        assert_eq!(sale.total_amount, Money::whole(200));
    }
}
