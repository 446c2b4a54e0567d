//! # Sale Workflow
//!
//! Converts carts into sales and handles sale cancellation.
//!
//! ## Cart → Sale Conversion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     convert_cart(cart_id, branch_id)                    │
//! │                                                                         │
//! │  1. validate ids ───────────────────────────── ValidationError          │
//! │  2. branch exists ──────────────────────────── NotFound                 │
//! │  3. cart exists ────────────────────────────── NotFound                 │
//! │     lock(cart owner), re-read cart                                      │
//! │  4. cart Active with a live line ───────────── BusinessRule             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  snapshot live lines → Sale, next_number()                              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  sales.create ─── fails ──► error, nothing changed                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  cart Converted, carts.update ─── fails ──► cancel the new sale,        │
//! │         │                                   report the failure          │
//! │         ▼                                                               │
//! │  announce SaleCreated                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation returns the events it produced, in the order they were
//! announced.

use std::sync::Arc;

use tracing::{debug, error, info};

use vendo_core::validation::validate_id;
use vendo_core::{Cart, Sale, SaleEvent};

use crate::error::{ServiceError, ServiceResult};
use crate::events::announce_all;
use crate::locks::UserLocks;
use crate::ports::{BranchLookup, CartRepository, EventAnnouncer, SaleNumberGenerator, SaleRepository};

/// A sale together with the events announced for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleOutcome {
    pub sale: Sale,
    pub events: Vec<SaleEvent>,
}

pub struct SaleService {
    branches: Arc<dyn BranchLookup>,
    carts: Arc<dyn CartRepository>,
    sales: Arc<dyn SaleRepository>,
    numbers: Arc<dyn SaleNumberGenerator>,
    announcer: Arc<dyn EventAnnouncer>,
    locks: Arc<UserLocks>,
}

impl SaleService {
    pub fn new(
        branches: Arc<dyn BranchLookup>,
        carts: Arc<dyn CartRepository>,
        sales: Arc<dyn SaleRepository>,
        numbers: Arc<dyn SaleNumberGenerator>,
        announcer: Arc<dyn EventAnnouncer>,
        locks: Arc<UserLocks>,
    ) -> Self {
        SaleService {
            branches,
            carts,
            sales,
            numbers,
            announcer,
            locks,
        }
    }

    /// Turns an active cart into a sale at `branch_id`.
    ///
    /// Discounts are copied from the cart lines, not recomputed.
    pub async fn convert_cart(&self, cart_id: i64, branch_id: i64) -> ServiceResult<SaleOutcome> {
        validate_id("cart_id", cart_id)?;
        validate_id("branch_id", branch_id)?;

        debug!(cart_id, branch_id, "Converting cart to sale");

        self.branches
            .branch(branch_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Branch", branch_id))?;

        let owner = self
            .carts
            .cart(cart_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart", cart_id))?
            .user_id;
        let _guard = self.locks.lock(owner).await;

        let mut cart = self
            .carts
            .cart(cart_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart", cart_id))?;

        let draft = Sale::from_cart(&cart, branch_id, self.numbers.next_number())?;
        let sale = self.sales.create(&draft).await?;

        if let Err(e) = self.finalize_cart(&mut cart).await {
            error!(
                cart_id,
                sale_id = sale.id,
                error = %e,
                "Cart finalization failed after sale was stored, canceling sale"
            );
            self.compensate(&sale).await;
            return Err(e);
        }

        info!(
            sale_id = sale.id,
            number = %sale.number,
            cart_id,
            total = %sale.total_amount,
            "Sale created"
        );

        let events = vec![SaleEvent::created(&sale)];
        announce_all(self.announcer.as_ref(), &events).await;
        Ok(SaleOutcome { sale, events })
    }

    /// Cancels a whole sale.
    pub async fn cancel_sale(&self, sale_id: i64) -> ServiceResult<SaleOutcome> {
        validate_id("sale_id", sale_id)?;

        let (_guard, mut sale) = self.locked_sale(sale_id).await?;

        sale.cancel()?;
        let sale = self.sales.update(&sale).await?;
        info!(sale_id, number = %sale.number, "Sale canceled");

        let events = vec![SaleEvent::canceled(&sale)];
        announce_all(self.announcer.as_ref(), &events).await;
        Ok(SaleOutcome { sale, events })
    }

    /// Cancels one item and lowers the sale total accordingly.
    ///
    /// The item and the new total are stored by a single `update`, so a
    /// failed write leaves both untouched and the call can be retried.
    pub async fn cancel_sale_item(&self, sale_id: i64, item_id: i64) -> ServiceResult<SaleOutcome> {
        validate_id("sale_id", sale_id)?;
        validate_id("item_id", item_id)?;

        let (_guard, mut sale) = self.locked_sale(sale_id).await?;

        sale.cancel_item(item_id)?;
        let sale = self.sales.update(&sale).await?;
        let item = sale
            .items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Sale item", item_id))?;
        info!(
            sale_id,
            item_id,
            total = %sale.total_amount,
            "Sale item canceled"
        );

        let events = vec![SaleEvent::item_canceled(&item), SaleEvent::modified(&sale)];
        announce_all(self.announcer.as_ref(), &events).await;
        Ok(SaleOutcome { sale, events })
    }

    pub async fn get_sale(&self, sale_id: i64) -> ServiceResult<Sale> {
        validate_id("sale_id", sale_id)?;
        self.sales
            .sale(sale_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", sale_id))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn finalize_cart(&self, cart: &mut Cart) -> ServiceResult<()> {
        cart.mark_converted()?;
        self.carts.update(cart).await?;
        Ok(())
    }

    /// Cancels a sale whose cart could not be finalized. The sale was never
    /// announced, so nothing is announced here either.
    async fn compensate(&self, sale: &Sale) {
        let mut rollback = sale.clone();
        if let Err(e) = rollback.cancel() {
            error!(sale_id = sale.id, error = %e, "Compensation failed");
            return;
        }
        match self.sales.update(&rollback).await {
            Ok(_) => info!(sale_id = sale.id, "Orphaned sale canceled"),
            Err(e) => error!(sale_id = sale.id, error = %e, "Compensation failed"),
        }
    }

    async fn locked_sale(
        &self,
        sale_id: i64,
    ) -> ServiceResult<(tokio::sync::OwnedMutexGuard<()>, Sale)> {
        let owner = self.get_sale(sale_id).await?.user_id;
        let guard = self.locks.lock(owner).await;
        let sale = self.get_sale(sale_id).await?;
        Ok((guard, sale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vendo_core::{CartItem, CartStatus, CoreError, Money, SaleItem};

    use crate::ports::{StoreError, StoreResult};
    use crate::test_support::{harness, Harness};

    async fn filled_cart(h: &Harness) -> Cart {
        h.carts.add_item(h.user, h.product, 2).await.unwrap()
    }

    #[tokio::test]
    async fn test_convert_cart() {
        let mut h = harness().await;
        let cart = filled_cart(&h).await;

        let outcome = h.sales.convert_cart(cart.id, h.branch).await.unwrap();

        assert_eq!(outcome.sale.total_amount, Money::whole(200));
        assert_eq!(outcome.sale.user_id, h.user);
        assert_eq!(outcome.sale.branch_id, h.branch);
        assert!(outcome.sale.number.starts_with("VND-"));
        assert_eq!(outcome.events.len(), 1);
        assert!(matches!(outcome.events[0], SaleEvent::SaleCreated { .. }));

        let stored_cart = h.carts.get_cart(cart.id).await.unwrap();
        assert_eq!(stored_cart.status, CartStatus::Converted);

        // Exactly one announcement
        let event = h.events.recv().await.unwrap();
        assert_eq!(event.sale_id(), outcome.sale.id);
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_conversion_preserves_lines() {
        let h = harness().await;
        h.carts.add_item(h.user, h.product, 5).await.unwrap();
        let cart = h.carts.add_item(h.user, h.cheap_product, 12).await.unwrap();
        let cart = h.carts.cancel_item(cart.id, h.cheap_product).await.unwrap();
        let cart = h.carts.add_item(h.user, h.extra_product("Tamper", 30).await, 1).await.unwrap();

        let sale = h.sales.convert_cart(cart.id, h.branch).await.unwrap().sale;

        // Canceled line is not sold
        assert_eq!(sale.items.len(), 2);
        for item in &sale.items {
            let line = cart.item(item.product_id).unwrap();
            assert_eq!(item.quantity, line.quantity);
            assert_eq!(item.unit_price, line.unit_price);
            assert_eq!(item.discount, line.discount);
            assert_eq!(item.total_amount, line.total_amount);
        }
        // 5 × 100 at 10% + 1 × 30
        assert_eq!(sale.total_amount, Money::whole(480));
    }

    #[tokio::test]
    async fn test_precondition_order() {
        let h = harness().await;
        let cart = filled_cart(&h).await;

        assert!(matches!(
            h.sales.convert_cart(0, h.branch).await,
            Err(ServiceError::Validation(_))
        ));
        // Missing branch is reported before a missing cart
        assert_eq!(
            h.sales.convert_cart(999, 999).await.unwrap_err(),
            ServiceError::not_found("Branch", 999)
        );
        assert_eq!(
            h.sales.convert_cart(999, h.branch).await.unwrap_err(),
            ServiceError::not_found("Cart", 999)
        );

        h.sales.convert_cart(cart.id, h.branch).await.unwrap();
        let err = h.sales.convert_cart(cart.id, h.branch).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::BusinessRule(CoreError::InvalidCartStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_canceled_and_empty_carts_rejected() {
        let mut h = harness().await;
        let cart = filled_cart(&h).await;
        h.carts.cancel_cart(cart.id).await.unwrap();
        assert!(matches!(
            h.sales.convert_cart(cart.id, h.branch).await,
            Err(ServiceError::BusinessRule(CoreError::InvalidCartStatus { .. }))
        ));

        let cart = filled_cart(&h).await;
        h.carts.cancel_item(cart.id, h.product).await.unwrap();
        assert!(matches!(
            h.sales.convert_cart(cart.id, h.branch).await,
            Err(ServiceError::BusinessRule(CoreError::EmptyCart { .. }))
        ));
        // Rejection left the cart active
        assert!(h.carts.get_cart(cart.id).await.unwrap().is_active());

        // No sale stored, nothing announced
        assert!(h.db.sales().list_for_user(h.user, 10).await.unwrap().is_empty());
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_sale_item() {
        let mut h = harness().await;
        h.carts.add_item(h.user, h.product, 2).await.unwrap();
        let cart = h.carts.add_item(h.user, h.cheap_product, 1).await.unwrap();
        let sale = h.sales.convert_cart(cart.id, h.branch).await.unwrap().sale;
        assert_eq!(sale.total_amount, Money::whole(250));
        h.events.recv().await.unwrap();

        let first = sale.items.iter().find(|i| i.product_id == h.product).unwrap();
        let outcome = h.sales.cancel_sale_item(sale.id, first.id).await.unwrap();

        assert_eq!(outcome.sale.total_amount, Money::whole(50));
        let kinds: Vec<&str> = outcome.events.iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, vec!["sale_item_canceled", "sale_modified"]);
        assert_eq!(h.events.recv().await.unwrap().event_type(), "sale_item_canceled");
        assert_eq!(h.events.recv().await.unwrap().event_type(), "sale_modified");

        let stored = h.sales.get_sale(sale.id).await.unwrap();
        assert_eq!(stored.total_amount, Money::whole(50));
        assert!(stored.items.iter().find(|i| i.id == first.id).unwrap().is_canceled());

        let err = h.sales.cancel_sale_item(sale.id, first.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::BusinessRule(CoreError::AlreadyCanceled { .. })
        ));
        assert_eq!(
            h.sales.cancel_sale_item(sale.id, 999).await.unwrap_err(),
            ServiceError::not_found("Sale item", 999)
        );
    }

    #[tokio::test]
    async fn test_cancel_sale() {
        let mut h = harness().await;
        let cart = filled_cart(&h).await;
        let sale = h.sales.convert_cart(cart.id, h.branch).await.unwrap().sale;
        h.events.recv().await.unwrap();

        let outcome = h.sales.cancel_sale(sale.id).await.unwrap();
        assert!(outcome.sale.is_canceled());
        assert_eq!(outcome.events, vec![SaleEvent::canceled(&outcome.sale)]);
        assert_eq!(h.events.recv().await.unwrap().event_type(), "sale_canceled");

        assert!(matches!(
            h.sales.cancel_sale(sale.id).await,
            Err(ServiceError::BusinessRule(CoreError::AlreadyCanceled { .. }))
        ));
        // Items of a canceled sale stay as they are
        let item_id = sale.items[0].id;
        assert!(matches!(
            h.sales.cancel_sale_item(sale.id, item_id).await,
            Err(ServiceError::BusinessRule(_))
        ));
    }

    /// Delegates to the real store but refuses to persist cart headers.
    struct BrokenCartUpdates(Arc<dyn CartRepository>);

    #[async_trait]
    impl CartRepository for BrokenCartUpdates {
        async fn active_cart_for_user(&self, user_id: i64) -> StoreResult<Option<Cart>> {
            self.0.active_cart_for_user(user_id).await
        }

        async fn cart(&self, id: i64) -> StoreResult<Option<Cart>> {
            self.0.cart(id).await
        }

        async fn create(&self, cart: &Cart) -> StoreResult<Cart> {
            self.0.create(cart).await
        }

        async fn update(&self, _cart: &Cart) -> StoreResult<Cart> {
            Err(StoreError::Failure("disk full".into()))
        }

        async fn add_item(&self, item: &CartItem) -> StoreResult<CartItem> {
            self.0.add_item(item).await
        }

        async fn update_item(&self, item: &CartItem) -> StoreResult<CartItem> {
            self.0.update_item(item).await
        }
    }

    #[tokio::test]
    async fn test_failed_cart_update_cancels_new_sale() {
        let mut h = harness().await;
        let cart = filled_cart(&h).await;

        let sales = SaleService::new(
            h.store.clone(),
            Arc::new(BrokenCartUpdates(h.store.clone())),
            h.store.clone(),
            h.numbers.clone(),
            h.announcer.clone(),
            h.locks.clone(),
        );

        let err = sales.convert_cart(cart.id, h.branch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));

        let stored = h.db.sales().list_for_user(h.user, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_canceled());

        assert!(h.carts.get_cart(cart.id).await.unwrap().is_active());
        assert!(h.events.try_recv().is_err());
    }

    /// Delegates to the real store but refuses to persist sale headers.
    struct BrokenSaleUpdates(Arc<dyn SaleRepository>);

    #[async_trait]
    impl SaleRepository for BrokenSaleUpdates {
        async fn create(&self, sale: &Sale) -> StoreResult<Sale> {
            self.0.create(sale).await
        }

        async fn sale(&self, id: i64) -> StoreResult<Option<Sale>> {
            self.0.sale(id).await
        }

        async fn update(&self, _sale: &Sale) -> StoreResult<Sale> {
            Err(StoreError::Failure("disk full".into()))
        }

        async fn update_item(&self, item: &SaleItem) -> StoreResult<SaleItem> {
            self.0.update_item(item).await
        }
    }

    #[tokio::test]
    async fn test_failed_sale_update_leaves_item_retryable() {
        let mut h = harness().await;
        h.carts.add_item(h.user, h.product, 2).await.unwrap();
        let cart = h.carts.add_item(h.user, h.cheap_product, 1).await.unwrap();
        let sale = h.sales.convert_cart(cart.id, h.branch).await.unwrap().sale;
        h.events.recv().await.unwrap();
        let first = sale.items.iter().find(|i| i.product_id == h.product).unwrap().id;

        let broken = SaleService::new(
            h.store.clone(),
            h.store.clone(),
            Arc::new(BrokenSaleUpdates(h.store.clone())),
            h.numbers.clone(),
            h.announcer.clone(),
            h.locks.clone(),
        );
        let err = broken.cancel_sale_item(sale.id, first).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
        assert!(h.events.try_recv().is_err());

        // Nothing was written, so the item is still live
        let stored = h.sales.get_sale(sale.id).await.unwrap();
        assert_eq!(stored.total_amount, Money::whole(250));
        assert!(stored.items.iter().all(|i| !i.is_canceled()));

        let outcome = h.sales.cancel_sale_item(sale.id, first).await.unwrap();
        assert_eq!(outcome.sale.total_amount, Money::whole(50));

        let stored = h.sales.get_sale(sale.id).await.unwrap();
        let live = Money::total(
            stored
                .items
                .iter()
                .filter(|i| !i.is_canceled())
                .map(|i| i.total_amount),
        )
        .unwrap();
        assert_eq!(stored.total_amount, live);
        assert_eq!(stored.total_amount, Money::whole(50));
    }
}
